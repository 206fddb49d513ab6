use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use symred::cnf::Cnf;
use symred::error::InputError;
use symred::input::{
    cnf_translation, normalize_boolean_values, parse_prefix, parse_symmetry_instance, Input,
};
use symred::output::{print_assignments, print_cnf_split, print_cubes, print_level_stats};
use symred::reducer::Reducer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Adaptive prefix-assignment symmetry reduction. Reads a CNF and/or a
/// symmetry graph with variable, value, and prefix declarations, and
/// emits one canonical representative per orbit of prefix assignments.
#[derive(Debug, Parser)]
#[command(name = "symred", version, about, long_about = None)]
struct Args {
    /// Read input from a file instead of standard input.
    #[arg(short, long, value_name = "IN")]
    file: Option<PathBuf>,

    /// Write output to a file instead of standard output.
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Do not expect CNF in the input.
    #[arg(short, long)]
    no_cnf: bool,

    /// A separate symmetry graph is supplied in the input.
    #[arg(short, long)]
    graph: bool,

    /// Use this prefix of 1-indexed variable vertices.
    #[arg(short, long, value_name = "SEQ", num_args = 1..)]
    prefix: Option<Vec<usize>>,

    /// Target length for the prefix.
    #[arg(short, long, value_name = "K")]
    length: Option<usize>,

    /// Output a partial assignment once its |Aut| falls to this threshold.
    #[arg(short, long, value_name = "N")]
    threshold: Option<u64>,

    /// Print symmetry information only.
    #[arg(short, long)]
    symmetry_only: bool,

    /// Give output in incremental (inccnf) format.
    #[arg(short, long)]
    incremental: bool,

    /// Verbose diagnostics.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), InputError> {
    let source: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };
    let mut input = Input::new(BufReader::new(source));
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let mut out = BufWriter::new(sink);

    let cnf = if args.no_cnf { None } else { Some(Cnf::parse(&mut input)?) };

    let mut instance = if args.graph {
        parse_symmetry_instance(&mut input)?
    } else {
        cnf.as_ref().ok_or(InputError::MissingCnf)?.companion_instance()
    };

    if let Some(sequence) = &args.prefix {
        for &u in sequence {
            if u < 1 || u > instance.base.len() {
                return Err(InputError::VertexOutOfRange(u));
            }
        }
        instance.prefix = sequence.iter().map(|&u| u - 1).collect();
    } else if args.length.is_none() {
        let spec = parse_prefix(&mut input, instance.base.len())?;
        instance.prefix = spec.prefix;
        instance.preset_values = spec.preset_values;
        instance.threshold = spec.threshold;
    }
    instance.target_length = args.length.unwrap_or(instance.prefix.len());
    if let Some(t) = args.threshold {
        instance.threshold = t;
    }

    let translation = match &cnf {
        Some(cnf) => {
            normalize_boolean_values(&mut instance)?;
            Some(cnf_translation(&instance, cnf.num_vars)?)
        }
        None => None,
    };

    info!(
        n = instance.base.len(),
        m = instance.base.num_edges(),
        v = instance.variables.len(),
        r = instance.values.len(),
        k = instance.prefix.len(),
        t = instance.threshold,
        "input"
    );

    let mut reducer = Reducer::new(instance)?;

    if args.symmetry_only {
        return Ok(());
    }

    match (&cnf, args.incremental) {
        (None, false) => print_assignments(&mut out, &mut reducer)?,
        (Some(cnf), false) => {
            print_cnf_split(&mut out, &mut reducer, cnf, translation.as_deref().unwrap())?
        }
        (Some(cnf), true) => {
            print_cubes(&mut out, &mut reducer, cnf, translation.as_deref().unwrap())?
        }
        (None, true) => return Err(InputError::MissingCnfForOutput),
    }
    out.flush()?;

    print_level_stats(&mut io::stderr().lock(), &reducer)?;
    Ok(())
}
