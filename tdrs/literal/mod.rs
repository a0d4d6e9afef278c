#![allow(clippy::module_inception)]
/// Problem variables, clause variables, polarities, literals, and clauses.
pub mod literal;

pub use crate::literal::literal::*;
