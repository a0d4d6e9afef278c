mod propagation;
mod transformer;

pub use crate::transform::propagation::{propagate, Propagation};
pub use crate::transform::transformer::{
    Aliases, TransformStatistics, Transformation, Transformer,
};
