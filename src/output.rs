//! Emission drivers: textual listing, CNF re-emission with branch
//! literals, incremental cubes, and the per-level statistics table.

use crate::cnf::Cnf;
use crate::error::InputError;
use crate::reducer::Reducer;
use itertools::Itertools;
use std::io::{self, Write};
use tracing::debug;

/// Drain the reducer, one line per assignment:
/// `<count>: [<aut>] <var> -> <val>, ...`.
pub fn print_assignments(out: &mut impl Write, reducer: &mut Reducer) -> io::Result<()> {
    let mut count = 0;
    while let Some(a) = reducer.next_assignment() {
        count += 1;
        let pairs = reducer.legend_pairs(&a);
        writeln!(
            out,
            "{}: [{}] {}",
            count,
            a.aut,
            pairs.iter().map(|(v, w)| format!("{v} -> {w}")).join(", ")
        )?;
    }
    Ok(())
}

/// Drain the reducer and re-emit the CNF split over branch literals:
/// every assignment becomes a block of 2-clauses tying its cube to a
/// fresh branch variable, closed by one clause over all branch
/// variables.
pub fn print_cnf_split(
    out: &mut impl Write,
    reducer: &mut Reducer,
    cnf: &Cnf,
    translation: &[Option<usize>],
) -> Result<(), InputError> {
    let mut conjuncts: Vec<i32> = vec![];
    let mut count = 0;
    while let Some(a) = reducer.next_assignment() {
        count += 1;
        debug!("branch {} {}", count, a.aut);
        for (&v, &w) in a.vars.iter().zip(&a.vals) {
            conjuncts.push(cnf_literal(reducer, translation, v, w));
        }
        conjuncts.push(0);
    }

    cnf.write(out, "cnf", Some((count, conjuncts.len() - count + 1)))?;
    let mut emitted = 0;
    for &l in &conjuncts {
        if l == 0 {
            emitted += 1;
        } else {
            writeln!(out, "{} {} 0", l, -((1 + cnf.num_vars + emitted) as i32))?;
        }
    }
    assert_eq!(emitted, count, "bad conjunct buffer");
    if count > 0 {
        writeln!(out, "{} 0", (0..count).map(|i| 1 + cnf.num_vars + i).join(" "))?;
    }
    Ok(())
}

/// Drain the reducer in incremental mode: the formula under a `p inccnf`
/// header, then one `a <lit...> 0` cube per assignment.
pub fn print_cubes(
    out: &mut impl Write,
    reducer: &mut Reducer,
    cnf: &Cnf,
    translation: &[Option<usize>],
) -> Result<(), InputError> {
    cnf.write(out, "inccnf", None)?;
    let mut count = 0;
    while let Some(a) = reducer.next_assignment() {
        count += 1;
        debug!("branch {} {}", count, a.aut);
        let cube = a
            .vars
            .iter()
            .zip(&a.vals)
            .map(|(&v, &w)| cnf_literal(reducer, translation, v, w))
            .join(" ");
        writeln!(out, "a {cube} 0")?;
    }
    Ok(())
}

/// Signed CNF literal of one assignment pair: negative for the false
/// value vertex, positive otherwise.
fn cnf_literal(reducer: &Reducer, translation: &[Option<usize>], var: usize, val: usize) -> i32 {
    let cnf_var = translation[var].expect("no CNF translation for variable vertex");
    let literal = (cnf_var + 1) as i32;
    if val == reducer.values()[0] {
        -literal
    } else {
        literal
    }
}

/// Per-level counters in the stderr report format.
pub fn print_level_stats(err: &mut impl Write, reducer: &Reducer) -> io::Result<()> {
    writeln!(err, "c {:>7} {:>14} {:>14} {:>14}", "Size", "Generated", "Canonical", "Output")?;
    for (level, c) in reducer.counters().enumerate() {
        writeln!(
            err,
            "c {:>7} {:>14} {:>14} {:>14}",
            level + 1,
            c.generated,
            c.canonical,
            c.emitted
        )?;
    }
    Ok(())
}
