#![allow(clippy::module_inception)]

mod manager;

pub mod external;
pub mod options;
pub mod qdimacs;

pub use crate::manager::manager::*;
