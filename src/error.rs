//! Input-error kinds. Malformed input and inconsistent declarations are
//! reported as values; internal contract violations panic instead.

use std::io;
use thiserror::Error;

/// A fatal problem with the input. Vertex numbers in messages are
/// 1-indexed, matching the text formats.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("parse error -- {0}")]
    Syntax(String),

    #[error("bad literal {literal} in CNF input (n = {num_vars})")]
    LiteralOutOfRange { literal: i32, num_vars: usize },

    #[error("bad vertex identifier u = {0}")]
    VertexOutOfRange(usize),

    #[error("bad variable parameter v = {0}")]
    BadVariableCount(usize),

    #[error("bad value parameter r = {0}")]
    BadValueCount(usize),

    #[error("variable list repeats an element ({0})")]
    RepeatedVariable(usize),

    #[error("value list repeats an element ({0})")]
    RepeatedValue(usize),

    #[error("prefix repeats an element ({0})")]
    RepeatedPrefixElement(usize),

    #[error("prefix element ({0}) is not a declared variable vertex")]
    PrefixNotVariable(usize),

    #[error("length of given prefix exceeds given target length for prefix")]
    PrefixExceedsTarget,

    #[error("no prefix given and nonpositive target length for prefix -- nothing to do")]
    NothingToDo,

    #[error("value range does not consist of 'false' and 'true'")]
    NonBooleanValues,

    #[error("parse error in variable legend '{0}'")]
    BadVariableLegend(String),

    #[error("parsed CNF variable in legend ({0}) is out of range")]
    CnfVariableOutOfRange(i64),

    #[error("repeated CNF variable ({0}) in legend")]
    RepeatedCnfVariable(usize),

    #[error(
        "variable list is not a union of orbits of the base graph \
         ({0} and {1} have different orbits)"
    )]
    VariablesNotOrbitUnion(usize, usize),

    #[error("value vertex ({0}) is not fixed by the automorphism group of the base graph")]
    ValueNotFixed(usize),

    #[error("cannot build the symmetry graph since no CNF was given")]
    MissingCnf,

    #[error("do not have CNF to print")]
    MissingCnfForOutput,
}
