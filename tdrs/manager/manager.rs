use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use tracing::{info, instrument};

use crate::{
    decomposition::{Decomposition, DecompositionTree},
    formula::Cnf,
    graph::{self, min_fill, Graph},
    literal::Literal,
    manager::{
        external,
        options::{DecompositionStrategy, ReformulationOptions},
        qdimacs::{write_qdimacs, QdimacsProblem},
    },
    transform::{propagate, Transformation, Transformer},
    Error, Result, Stage,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReformulationStatistics {
    /// Nodes of the normalized tree, clones included.
    pub nodes: usize,
    pub clones: usize,
    pub definitions: usize,
    pub aliases: usize,
    pub closed: usize,
    /// Clauses of the CNF before unit propagation.
    pub clauses: usize,
    /// Variables assigned by unit propagation.
    pub eliminated: usize,
}

/// Reformulated problem together with the normalized tree it was built from.
#[derive(Debug)]
pub struct Reformulation<'c> {
    pub tree: DecompositionTree<'c>,
    pub transformation: Transformation,
    pub cnf: Cnf,
    pub eliminated: Vec<Literal>,
    /// Width of the normalized decomposition tree.
    pub width: usize,
    pub statistics: ReformulationStatistics,
}

/// Runs one problem through every stage of the reformulation.
///
/// Errors are reported as [`Error::Stage`] naming the input and the failing stage.
pub struct Reformulator {
    options: ReformulationOptions,
}

impl Reformulator {
    #[must_use]
    pub fn new(options: ReformulationOptions) -> Reformulator {
        Reformulator { options }
    }

    #[must_use]
    pub fn options(&self) -> &ReformulationOptions {
        &self.options
    }

    /// Read the QDIMACS file `input`, preprocessing it first when a preprocessor is set.
    ///
    /// # Errors
    ///
    /// Returns an error in [`Stage::Parse`] if the file cannot be read, the
    /// preprocessor fails, or the file is not valid QDIMACS.
    #[instrument(skip(self))]
    pub fn read(&self, input: &Path) -> Result<QdimacsProblem> {
        let name = input.display().to_string();
        let read = || -> Result<QdimacsProblem> {
            let path = match &self.options.preprocessor {
                Some(preprocessor) => {
                    let preprocessed = self
                        .options
                        .work_dir
                        .join(format!("{}_preprocessed.qdimacs", basename(input)));
                    external::preprocess(preprocessor, input, &preprocessed)?;
                    preprocessed
                }
                None => input.to_path_buf(),
            };

            let mut reader = BufReader::new(File::open(path)?);
            QdimacsProblem::read(&mut reader)
        };

        let problem = read().map_err(|err| err.in_stage(&name, Stage::Parse))?;
        info!(
            clauses = problem.clauses.len(),
            blocks = problem.blocks.len(),
            "read problem"
        );
        Ok(problem)
    }

    /// Tree decomposition of the bipartite graph of `problem`.
    ///
    /// # Errors
    ///
    /// Returns an error in [`Stage::Decompose`] if the external decomposer fails.
    #[instrument(skip_all, fields(input = input))]
    pub fn decompose(&self, input: &str, problem: &QdimacsProblem) -> Result<Decomposition> {
        let graph = graph::bipartite(&problem.clauses);
        let decomposition = match self.options.strategy {
            DecompositionStrategy::MinFill => Ok(min_fill::decompose(&graph)),
            DecompositionStrategy::External => self.decompose_externally(&graph, input),
        }
        .map_err(|err| err.in_stage(input, Stage::Decompose))?;

        info!(
            bags = decomposition.bags.len(),
            width = decomposition.width(),
            "decomposed bipartite graph"
        );
        Ok(decomposition)
    }

    /// Decompose `graph` with the external decomposer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::External`] if no decomposer is configured or it fails.
    pub fn decompose_externally(&self, graph: &Graph, input: &str) -> Result<Decomposition> {
        let Some(decomposer) = &self.options.decomposer else {
            return Err(Error::External {
                command: String::new(),
                reason: "no decomposer script configured".to_owned(),
            });
        };

        external::decompose(
            graph,
            decomposer,
            self.options.decomposer_time,
            &self.options.work_dir,
            &basename(Path::new(input)),
        )
    }

    /// Build and normalize the decomposition tree, transform it, convert the
    /// result to CNF and propagate unit clauses over the unprotected variables.
    ///
    /// # Errors
    ///
    /// Returns an error in [`Stage::Build`] if the decomposition does not describe
    /// a tree over the clauses of `problem`.
    #[instrument(skip_all, fields(input = input))]
    pub fn reformulate<'c>(
        &self,
        input: &str,
        problem: &'c QdimacsProblem,
        decomposition: &Decomposition,
    ) -> Result<Reformulation<'c>> {
        let mut tree = DecompositionTree::build(decomposition, &problem.clauses)
            .map_err(|err| err.in_stage(input, Stage::Build))?;
        tree.normalize();
        info!(nodes = tree.len(), clones = tree.clones(), "built tree");

        let transformation = Transformer::new(&tree).transform_with_seed(self.options.seed.clone());
        info!(
            definitions = transformation.statistics.definitions,
            aliases = transformation.statistics.aliases,
            "transformed tree"
        );

        let cnf = transformation.formula.to_cnf();
        let clauses = cnf.len();
        info!(clauses, "converted to CNF");

        let (cnf, eliminated) = if self.options.unit_propagation {
            let propagation = propagate(&cnf, &problem.protected());
            info!(
                eliminated = propagation.eliminated.len(),
                clauses = propagation.cnf.len(),
                "propagated units"
            );
            (propagation.cnf, propagation.eliminated)
        } else {
            (cnf, Vec::new())
        };

        let width = tree.width();
        let statistics = ReformulationStatistics {
            nodes: tree.len(),
            clones: tree.clones(),
            definitions: transformation.statistics.definitions,
            aliases: transformation.statistics.aliases,
            closed: transformation.statistics.closed,
            clauses,
            eliminated: eliminated.len(),
        };

        Ok(Reformulation {
            tree,
            transformation,
            cnf,
            eliminated,
            width,
            statistics,
        })
    }

    /// Width of the normalized decomposition tree `decomposition` induces over
    /// the clauses of `problem`, without transforming it.
    ///
    /// # Errors
    ///
    /// Returns an error in [`Stage::Build`] if the decomposition does not describe
    /// a tree over the clauses of `problem`.
    pub fn tree_width(
        &self,
        input: &str,
        problem: &QdimacsProblem,
        decomposition: &Decomposition,
    ) -> Result<usize> {
        let mut tree = DecompositionTree::build(decomposition, &problem.clauses)
            .map_err(|err| err.in_stage(input, Stage::Build))?;
        tree.normalize();
        Ok(tree.width())
    }

    /// Write the reformulated `cnf` with the prefix of `problem` to `output`,
    /// passing it through the preprocessor when one is set.
    ///
    /// # Errors
    ///
    /// Returns an error in [`Stage::Write`] if writing fails or the preprocessor fails.
    #[instrument(skip(self, problem, cnf))]
    pub fn write(&self, problem: &QdimacsProblem, cnf: &Cnf, output: &Path) -> Result<()> {
        let write = || -> Result<()> {
            let path = match &self.options.preprocessor {
                Some(_) => self
                    .options
                    .work_dir
                    .join(format!("{}_postprocessed.qdimacs", basename(output))),
                None => output.to_path_buf(),
            };

            let mut writer = BufWriter::new(File::create(&path)?);
            write_qdimacs(problem, cnf, &mut writer)?;

            if let Some(preprocessor) = &self.options.preprocessor {
                external::preprocess(preprocessor, &path, output)?;
            }
            Ok(())
        };

        write().map_err(|err| err.in_stage(&output.display().to_string(), Stage::Write))?;
        info!(output = %output.display(), "wrote reformulation");
        Ok(())
    }

    /// Reformulate the QDIMACS file `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub fn run(&self, input: &Path, output: &Path) -> Result<ReformulationStatistics> {
        let name = input.display().to_string();
        let problem = self.read(input)?;
        let decomposition = self.decompose(&name, &problem)?;
        let reformulation = self.reformulate(&name, &problem, &decomposition)?;
        self.write(&problem, &reformulation.cnf, output)?;
        Ok(reformulation.statistics)
    }
}

/// File name of `path` without its extension.
#[must_use]
pub fn basename(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "input".to_owned(), |stem| stem.to_string_lossy().into_owned())
}

/// `<output_dir>/<basename>_new.qdimacs` for the input file `input`.
#[must_use]
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}_new.qdimacs", basename(input)))
}
