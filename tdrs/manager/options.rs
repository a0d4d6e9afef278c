use std::path::PathBuf;

use bon::Builder;
use clap::ValueEnum;

use crate::formula::Expr;

/// How the tree decomposition of the bipartite graph is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecompositionStrategy {
    /// Min-fill elimination computed in-process.
    MinFill,
    /// External decomposer reading a PACE `.gr` graph and writing a `.td` decomposition.
    External,
}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Builder)]
pub struct ReformulationOptions {
    #[builder(default = DecompositionStrategy::MinFill)]
    pub strategy: DecompositionStrategy,

    /// Shell script invoked as `sh DECOMPOSER GRAPH DECOMPOSITION SECONDS`.
    #[builder(into)]
    pub decomposer: Option<PathBuf>,

    /// Seconds the external decomposer may run.
    #[builder(default = 30)]
    pub decomposer_time: u64,

    /// Shell script invoked as `sh PREPROCESSOR INPUT OUTPUT` on the input before
    /// parsing and on the result before it is written out.
    #[builder(into)]
    pub preprocessor: Option<PathBuf>,

    /// Directory for the graphs, decompositions and intermediate files.
    #[builder(default = std::env::temp_dir(), into)]
    pub work_dir: PathBuf,

    #[builder(default = true)]
    pub unit_propagation: bool,

    /// Formula the transformation is conjoined to.
    #[builder(default = Expr::tautology())]
    pub seed: Expr,
}

impl Default for ReformulationOptions {
    fn default() -> Self {
        ReformulationOptions::builder().build()
    }
}
