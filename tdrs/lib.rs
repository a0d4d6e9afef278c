//! # Tree-decomposition guided reformulation of (quantified) CNF formulas.
//!
//! Given a CNF formula and a tree decomposition of its
//! [incidence graph](https://en.wikipedia.org/wiki/Incidence_graph), build an
//! equisatisfiable CNF whose structure follows the decomposition. Every clause
//! is replaced by *clause variables* `c_<clause>_<node>` that are defined
//! bottom-up along the decomposition tree and asserted where the clause leaves
//! the tree, so the width of the result is bounded by the width of the
//! decomposition.
//!
//! The library provides:
//! * reading and writing of [QDIMACS](https://www.qbflib.org/qdimacs.html) files, keeping the quantifier prefix,
//! * primal and bipartite graphs, PACE `.gr` / `.td` files, and a min-fill tree decomposition heuristic,
//! * building and normalizing decomposition trees and rendering them to the DOT format,
//! * the post-order transformation with clause-variable aliasing,
//! * CNF conversion and unit propagation that never assigns universally quantified variables.
//!
//! The following snippet reformulates `(x_1 ∨ x_2) ∧ (¬x_1 ∨ x_3)` along a
//! decomposition with two bags and writes the result as QDIMACS.
//!
//! ```rust
//! use tdrs::decomposition::Decomposition;
//! use tdrs::literal::Clause;
//! use tdrs::manager::{options::ReformulationOptions, qdimacs, Reformulator};
//!
//! let problem = qdimacs::QdimacsProblem::from_clauses(vec![
//!     Clause::new([1, 2]),
//!     Clause::new([-1, 3]),
//! ]);
//! let decomposition = Decomposition::from((
//!     vec![vec!["x_1", "x_2", "c_1"], vec!["x_1", "x_3", "c_2"]],
//!     vec![(0, 1)],
//! ));
//!
//! let reformulator = Reformulator::new(ReformulationOptions::default());
//! let reformulation = reformulator
//!     .reformulate("example", &problem, &decomposition)
//!     .unwrap();
//! println!("width of the decomposition: {}", reformulation.width);
//!
//! let mut output = Vec::<u8>::new();
//! qdimacs::write_qdimacs(&problem, &reformulation.cnf, &mut output).unwrap();
//! ```
//!
//! ---
//!
//! The stages of [`crate::manager::Reformulator`] can also be run one by one:
//!
//! * [`crate::decomposition::DecompositionTree::build`] -- link bags into a tree rooted at the first bag
//! * [`crate::decomposition::DecompositionTree::normalize`] -- split nodes so that no node has more than two children
//! * [`crate::transform::Transformer::transform`] -- define and close clause variables bottom-up
//! * [`crate::formula::Expr::to_cnf`] -- convert the result to CNF
//! * [`crate::transform::propagate`] -- propagate unit clauses over unprotected variables
//!
//! Decompositions come from [`crate::graph::min_fill::decompose`] or from an
//! external decomposer through [`crate::manager::external::decompose`].

/// Problem variables, clause variables, and literals.
pub mod literal;

pub mod decomposition;
pub mod formula;
pub mod graph;
pub mod manager;
pub mod transform;

pub(crate) mod dot_writer;
mod error;

pub use crate::error::{Error, Result, Stage};
