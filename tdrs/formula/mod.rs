//! Boolean expressions, their conversion to CNF, and model enumeration.
pub mod cnf;
pub mod expr;
pub mod model;

pub use crate::formula::cnf::{Cnf, EncodedCnf};
pub use crate::formula::expr::Expr;
pub use crate::formula::model::{Model, Models};
