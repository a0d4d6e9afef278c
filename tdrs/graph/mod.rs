//! Primal and bipartite graphs of a formula, their PACE serialization, and
//! min-fill tree decompositions.
#![allow(clippy::module_inception)]
mod graph;

pub mod min_fill;
pub mod pace;

pub use crate::graph::graph::*;
