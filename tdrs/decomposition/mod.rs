//! Tree decompositions of a formula and their rooted, normalized trees.
mod bags;
pub mod tree;

pub use crate::decomposition::bags::Decomposition;
pub use crate::decomposition::tree::{DecompositionTree, Node, ROOT};
