use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tdrs::{
    graph::{self, min_fill},
    manager::{
        basename, output_path,
        options::{DecompositionStrategy, ReformulationOptions},
        qdimacs::QdimacsProblem,
        ReformulationStatistics, Reformulator,
    },
};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    None,
}

impl LogLevel {
    fn to_trace(&self) -> Option<tracing::Level> {
        Some(match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::None => return None,
        })
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// QDIMACS files to reformulate
    #[arg(required = true, value_name = "INPUT.qdimacs")]
    inputs: Vec<PathBuf>,

    /// Directory where `<INPUT>_new.qdimacs` files are stored
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Script computing tree decompositions, invoked as
    /// `sh SCRIPT GRAPH.gr DECOMPOSITION.td SECONDS`.
    #[arg(short, long, value_name = "SCRIPT.sh")]
    decomposer: Option<PathBuf>,

    /// How the decomposition of the bipartite graph is computed. Defaults to
    /// `external` when a decomposer is given and to `min-fill` otherwise.
    #[arg(long, value_enum)]
    strategy: Option<DecompositionStrategy>,

    /// Seconds the decomposer may spend on a single graph.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    decomposer_time: u64,

    /// Script invoked as `sh SCRIPT IN OUT` on every input before it is parsed
    /// and on every result before it is stored.
    #[arg(long, value_name = "SCRIPT.sh")]
    preprocess: Option<PathBuf>,

    /// Directory for graphs, decompositions, and intermediate files.
    /// Defaults to the output directory.
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Do not propagate unit clauses after the transformation.
    #[arg(long)]
    no_unit_propagation: bool,

    /// Append a width comparison of every input to FILE: min-fill width of the
    /// primal graph and widths of the bipartite graph of the reformulation.
    #[arg(short, long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Where to store the DOT graph of the normalized decomposition tree.
    /// With several inputs, the name of the input is prepended to the file name.
    #[arg(short, long, value_name = "FILE.dot")]
    tree_dot_path: Option<PathBuf>,

    /// Verbosity level. See `tracing::Level` for more information.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    verbosity: LogLevel,

    /// Print timing and size statistics.
    #[arg(short, long)]
    print_statistics: bool,
}

impl Cli {
    fn strategy(&self) -> DecompositionStrategy {
        match (self.strategy, &self.decomposer) {
            (Some(strategy), _) => strategy,
            (None, Some(_)) => DecompositionStrategy::External,
            (None, None) => DecompositionStrategy::MinFill,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Statistics {
    parsing: Duration,
    decomposition: Duration,
    reformulation: Duration,
    writing: Duration,

    clauses: usize,
    decomposition_width: usize,
    tree_width: usize,
    counts: ReformulationStatistics,
    clauses_after_propagation: usize,
}

impl Statistics {
    fn print(&self, input: &Path) {
        println!("{}:", input.display());
        println!("  parsing time       : {:.2?}", self.parsing);
        println!("  decomposition time : {:.2?}", self.decomposition);
        println!("  reformulation time : {:.2?}", self.reformulation);
        println!("  writing time       : {:.2?}", self.writing);
        println!("  input clauses      : {}", self.clauses);
        println!("  decomposition width: {}", self.decomposition_width);
        println!(
            "  tree width         : {} ({} nodes, {} clones)",
            self.tree_width, self.counts.nodes, self.counts.clones
        );
        println!(
            "  clause variables   : {} defined, {} aliased, {} closed",
            self.counts.definitions, self.counts.aliases, self.counts.closed
        );
        println!(
            "  output clauses     : {} ({} before propagation, {} units eliminated)",
            self.clauses_after_propagation, self.counts.clauses, self.counts.eliminated
        );
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Some(level) = args.verbosity.to_trace() {
        tracing_subscriber::fmt().with_max_level(level).init();
    }

    if let Err(err) = fs::create_dir_all(&args.output_dir) {
        tracing::error!(
            "could not create output directory '{}': {err}",
            args.output_dir.display()
        );
        return ExitCode::FAILURE;
    }

    if let Some(path) = &args.report {
        if let Err(err) = File::create(path) {
            tracing::error!("could not create report '{}': {err}", path.display());
            return ExitCode::FAILURE;
        }
    }

    let options = ReformulationOptions::builder()
        .strategy(args.strategy())
        .maybe_decomposer(args.decomposer.clone())
        .decomposer_time(args.decomposer_time)
        .maybe_preprocessor(args.preprocess.clone())
        .work_dir(args.work_dir.clone().unwrap_or_else(|| args.output_dir.clone()))
        .unit_propagation(!args.no_unit_propagation)
        .build();
    let reformulator = Reformulator::new(options);

    let mut failed = 0;
    for input in &args.inputs {
        tracing::info!(input = %input.display(), "reformulating");
        match process(&args, &reformulator, input) {
            Ok(statistics) => {
                if args.print_statistics {
                    statistics.print(input);
                }
            }
            Err(err) => {
                tracing::error!("{err:#}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        tracing::error!(
            failed,
            total = args.inputs.len(),
            "some inputs could not be reformulated"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn process(args: &Cli, reformulator: &Reformulator, input: &Path) -> anyhow::Result<Statistics> {
    let name = input.display().to_string();
    let mut statistics = Statistics::default();

    let start = Instant::now();
    let problem = reformulator.read(input)?;
    statistics.parsing = start.elapsed();
    statistics.clauses = problem.clauses.len();

    let start = Instant::now();
    let decomposition = reformulator.decompose(&name, &problem)?;
    statistics.decomposition = start.elapsed();
    statistics.decomposition_width = decomposition.width();

    let start = Instant::now();
    let reformulation = reformulator.reformulate(&name, &problem, &decomposition)?;
    statistics.reformulation = start.elapsed();
    statistics.tree_width = reformulation.width;
    statistics.counts = reformulation.statistics;
    statistics.clauses_after_propagation = reformulation.cnf.len();

    let start = Instant::now();
    let output = output_path(&args.output_dir, input);
    reformulator.write(&problem, &reformulation.cnf, &output)?;
    statistics.writing = start.elapsed();

    if let Some(path) = &args.tree_dot_path {
        let path = if args.inputs.len() > 1 {
            prefixed(path, &basename(input))
        } else {
            path.clone()
        };

        write_to_file(&path, |writer: &mut dyn Write| {
            reformulation.tree.draw_tree(writer)
        })?;
    }

    if let Some(path) = &args.report {
        let report = width_report(args, reformulator, input, &problem, reformulation.width)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("could not open report '{}'", path.display()))?;
        file.write_all(report.as_bytes())
            .with_context(|| format!("could not write report '{}'", path.display()))?;
    }

    Ok(statistics)
}

/// Min-fill width of the primal graph of the input, next to the widths of the
/// normalized trees built from the min-fill and the external decompositions of
/// its bipartite graph. `tree_width` belongs to the decomposition selected by
/// the strategy; the other one is computed here.
fn width_report(
    args: &Cli,
    reformulator: &Reformulator,
    input: &Path,
    problem: &QdimacsProblem,
    tree_width: usize,
) -> anyhow::Result<String> {
    let name = basename(input);
    let input_name = input.display().to_string();
    let primal_width = min_fill::width(&graph::primal(&problem.clauses));
    let strategy = args.strategy();

    let min_fill_width = match strategy {
        DecompositionStrategy::MinFill => tree_width,
        DecompositionStrategy::External => {
            let decomposition = min_fill::decompose(&graph::bipartite(&problem.clauses));
            reformulator
                .tree_width(&input_name, problem, &decomposition)
                .with_context(|| format!("{input_name}: report"))?
        }
    };

    let mut report = format!("RESULTS OF {name}.qdimacs:\n");
    report += &format!("width of primal graph: {primal_width}\n");
    report += &format!(
        "width of min-fill bipartite graph after transformation: {min_fill_width}\n"
    );

    if args.decomposer.is_some() {
        let external_width = match strategy {
            DecompositionStrategy::External => tree_width,
            DecompositionStrategy::MinFill => reformulator
                .decompose_externally(&graph::bipartite(&problem.clauses), &input_name)
                .and_then(|decomposition| {
                    reformulator.tree_width(&input_name, problem, &decomposition)
                })
                .with_context(|| format!("{input_name}: report"))?,
        };
        report += &format!(
            "width of external bipartite graph after transformation: {external_width}\n"
        );
    }

    report.push('\n');
    Ok(report)
}

fn prefixed(path: &Path, prefix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map_or_else(|| "tree.dot".to_owned(), |name| name.to_string_lossy().into_owned());
    path.with_file_name(format!("{prefix}_{file_name}"))
}

fn write_to_file(
    path: &Path,
    writer: impl Fn(&mut dyn std::io::Write) -> tdrs::Result<()>,
) -> anyhow::Result<()> {
    let f = File::create(path).with_context(|| format!("could not create '{}'", path.display()))?;
    let mut b = BufWriter::new(f);
    writer(&mut b as &mut dyn std::io::Write)
        .with_context(|| format!("could not write '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};

    use clap::Parser;

    use super::{prefixed, width_report, Cli};
    use tdrs::manager::{
        options::{DecompositionStrategy, ReformulationOptions},
        qdimacs::QdimacsProblem,
        Reformulator,
    };

    #[test]
    fn parse_arguments() {
        let args = Cli::parse_from([
            "tdrsc",
            "--output-dir",
            "out",
            "--no-unit-propagation",
            "--decomposer-time",
            "5",
            "a.qdimacs",
            "b.qdimacs",
        ]);

        assert_eq!(
            args.inputs,
            vec![PathBuf::from("a.qdimacs"), PathBuf::from("b.qdimacs")]
        );
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.decomposer_time, 5);
        assert!(args.no_unit_propagation);
        assert!(args.decomposer.is_none());

        assert!(Cli::try_parse_from(["tdrsc"]).is_err());
    }

    #[test]
    fn report_uses_tree_width() {
        let args = Cli::parse_from(["tdrsc", "--report", "report.txt", "dir/formula.qdimacs"]);
        let problem = QdimacsProblem::read(&mut std::io::BufReader::new(
            "p cnf 5 4\n1 2 -3 0\n-1 4 0\n2 4 5 0\n-5 3 0\n".as_bytes(),
        ))
        .unwrap();
        let reformulator = Reformulator::new(ReformulationOptions::default());
        let decomposition = reformulator.decompose("formula", &problem).unwrap();
        let reformulation = reformulator
            .reformulate("formula", &problem, &decomposition)
            .unwrap();

        let report = width_report(
            &args,
            &reformulator,
            Path::new("dir/formula.qdimacs"),
            &problem,
            reformulation.width,
        )
        .unwrap();
        assert_eq!(
            report,
            format!(
                "RESULTS OF formula.qdimacs:\n\
                 width of primal graph: 3\n\
                 width of min-fill bipartite graph after transformation: {}\n\n",
                reformulation.width
            )
        );
    }

    #[test]
    fn strategy_follows_decomposer() {
        assert_eq!(
            Cli::parse_from(["tdrsc", "a.qdimacs"]).strategy(),
            DecompositionStrategy::MinFill
        );
        assert_eq!(
            Cli::parse_from(["tdrsc", "--decomposer", "td.sh", "a.qdimacs"]).strategy(),
            DecompositionStrategy::External
        );
        assert_eq!(
            Cli::parse_from([
                "tdrsc",
                "--decomposer",
                "td.sh",
                "--strategy",
                "min-fill",
                "a.qdimacs"
            ])
            .strategy(),
            DecompositionStrategy::MinFill
        );
        assert!(Cli::try_parse_from(["tdrsc", "--strategy", "greedy", "a.qdimacs"]).is_err());
    }

    #[test]
    fn dot_paths_for_several_inputs() {
        assert_eq!(
            prefixed(Path::new("out/tree.dot"), "formula"),
            PathBuf::from("out/formula_tree.dot")
        );
    }
}
