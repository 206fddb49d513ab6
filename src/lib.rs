//! Adaptive prefix-assignment symmetry reduction: enumerate, up to the
//! automorphism group of a vertex-colored graph, one canonical
//! representative per orbit of partial value assignments to a growing
//! prefix of variable vertices.

pub mod canon;
pub mod cnf;
pub mod error;
pub mod graph;
pub mod input;
pub mod orbit;
pub mod output;
pub mod perm;
pub mod reducer;

pub use error::InputError;
pub use graph::ColoredGraph;
pub use perm::Perm;
pub use reducer::{Assignment, Instance, Reducer};
