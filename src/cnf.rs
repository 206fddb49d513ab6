//! DIMACS CNF instances and their companion symmetry graphs.

use crate::error::InputError;
use crate::graph::ColoredGraph;
use crate::input::Input;
use crate::reducer::Instance;
use itertools::Itertools;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// A CNF formula: header counts plus the clauses as one flat
/// zero-terminated literal buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cnf {
    pub num_vars: usize,
    pub num_clauses: usize,
    literals: Vec<i32>,
}

impl Cnf {
    /// Parse the DIMACS header and clauses. Comment lines (leading `c`)
    /// are skipped; literals may be split across lines arbitrarily.
    pub fn parse<R: BufRead>(input: &mut Input<R>) -> Result<Self, InputError> {
        let header = input
            .next_content_line()?
            .ok_or_else(|| InputError::Syntax("CNF format line expected".into()))?;
        let fields = header.split_whitespace().collect_vec();
        let (num_vars, num_clauses) = match fields.as_slice() {
            ["p", "cnf", nv, nc] => {
                let nv: i64 = nv
                    .parse()
                    .map_err(|_| InputError::Syntax("CNF format line expected".into()))?;
                let nc: i64 = nc
                    .parse()
                    .map_err(|_| InputError::Syntax("CNF format line expected".into()))?;
                if nv < 1 {
                    return Err(InputError::Syntax(format!(
                        "bad number-of-variables parameter (n = {nv}) in CNF"
                    )));
                }
                if nc < 0 {
                    return Err(InputError::Syntax(format!(
                        "bad number-of-clauses parameter (c = {nc}) in CNF"
                    )));
                }
                (nv as usize, nc as usize)
            }
            _ => return Err(InputError::Syntax("CNF format line expected".into())),
        };

        let mut literals = vec![];
        let mut pending = VecDeque::new();
        for _ in 0..num_clauses {
            loop {
                let l = next_literal(input, &mut pending)?;
                if l.unsigned_abs() as usize > num_vars {
                    return Err(InputError::LiteralOutOfRange { literal: l, num_vars });
                }
                literals.push(l);
                if l == 0 {
                    break;
                }
            }
        }
        Ok(Self { num_vars, num_clauses, literals })
    }

    /// Clauses without their terminating zeros.
    pub fn clauses(&self) -> impl Iterator<Item = &[i32]> {
        self.literals.split(|&l| l == 0).take(self.num_clauses)
    }

    /// Companion symmetry graph and declarations. Vertices: the CNF
    /// variables, a negative and a positive literal vertex per variable,
    /// the false/true value vertices, and one vertex per clause; each
    /// class gets its own color.
    pub fn companion_instance(&self) -> Instance {
        let nv = self.num_vars;
        let n = 3 * nv + 2 + self.num_clauses;
        let colors = (0..n).map(move |v| match v {
            v if v < nv => 0,
            v if v < 2 * nv => 1,
            v if v < 3 * nv => 2,
            v if v == 3 * nv => 3,
            v if v == 3 * nv + 1 => 4,
            _ => 5,
        });
        let mut base = ColoredGraph::empty(colors);
        for i in 0..nv {
            base.insert_edge((i, nv + i));
            base.insert_edge((i, 2 * nv + i));
        }
        for (c, clause) in self.clauses().enumerate() {
            for &l in clause {
                let literal_vertex = if l < 0 {
                    nv + (l.unsigned_abs() as usize - 1)
                } else {
                    2 * nv + (l as usize - 1)
                };
                base.insert_edge((literal_vertex, 3 * nv + 2 + c));
            }
        }
        Instance {
            base,
            variables: (0..nv).collect(),
            var_legends: (1..=nv).map(|i| i.to_string()).collect(),
            values: vec![3 * nv, 3 * nv + 1],
            val_legends: vec!["false".into(), "true".into()],
            prefix: vec![],
            preset_values: vec![],
            target_length: 0,
            threshold: 0,
        }
    }

    /// Re-emit the formula under the given format tag, adjusting the
    /// header counts by `(extra_vars, extra_clauses)` when present.
    pub fn write(
        &self,
        out: &mut impl Write,
        fmt: &str,
        adjust: Option<(usize, usize)>,
    ) -> io::Result<()> {
        match adjust {
            Some((extra_vars, extra_clauses)) => writeln!(
                out,
                "p {} {} {}",
                fmt,
                self.num_vars + extra_vars,
                self.num_clauses + extra_clauses
            )?,
            None => writeln!(out, "p {fmt}")?,
        }
        for clause in self.clauses() {
            if clause.is_empty() {
                writeln!(out, "0")?;
            } else {
                writeln!(out, "{} 0", clause.iter().join(" "))?;
            }
        }
        Ok(())
    }
}

fn next_literal<R: BufRead>(
    input: &mut Input<R>,
    pending: &mut VecDeque<i32>,
) -> Result<i32, InputError> {
    loop {
        if let Some(l) = pending.pop_front() {
            return Ok(l);
        }
        let line = input
            .next_content_line()?
            .ok_or_else(|| InputError::Syntax("CNF literal expected".into()))?;
        for token in line.split_whitespace() {
            pending.push_back(
                token
                    .parse()
                    .map_err(|_| InputError::Syntax("CNF literal expected".into()))?,
            );
        }
    }
}
