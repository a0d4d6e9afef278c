//! External decomposers and preprocessors, run as `sh` scripts.
use std::{
    ffi::OsStr,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    process::Command,
};

use tracing::{debug, instrument};

use crate::{
    decomposition::Decomposition,
    graph::{pace, Graph},
    Error, Result,
};

/// Write `graph` to `<work_dir>/<name>.gr`, let `decomposer` compute a tree decomposition
/// into `<work_dir>/<name>_td.gr` within `seconds`, and read it back.
///
/// # Errors
///
/// Returns an error if the files cannot be written or read, the decomposer fails,
/// or its output is not a valid `.td` file.
#[instrument(skip(graph), fields(vertices = graph.node_count()))]
pub fn decompose(
    graph: &Graph,
    decomposer: &Path,
    seconds: u64,
    work_dir: &Path,
    name: &str,
) -> Result<Decomposition> {
    let graph_path = work_dir.join(format!("{name}.gr"));
    let decomposition_path = work_dir.join(format!("{name}_td.gr"));

    let dictionary = {
        let mut writer = BufWriter::new(File::create(&graph_path)?);
        pace::write_graph(graph, &mut writer)?
    };

    run(
        decomposer,
        &[
            graph_path.as_os_str(),
            decomposition_path.as_os_str(),
            OsStr::new(&seconds.to_string()),
        ],
    )?;

    let mut reader = BufReader::new(File::open(&decomposition_path)?);
    pace::read_decomposition(&mut reader, &dictionary)
}

/// Run `preprocessor` on the QDIMACS file `input`, producing `output`.
///
/// # Errors
///
/// Returns [`Error::External`] if the script cannot be started or fails.
pub fn preprocess(preprocessor: &Path, input: &Path, output: &Path) -> Result<()> {
    run(preprocessor, &[input.as_os_str(), output.as_os_str()])
}

fn run(script: &Path, args: &[&OsStr]) -> Result<()> {
    let command = script.display().to_string();
    debug!(%command, ?args, "running external command");

    let output = Command::new("sh")
        .arg(script)
        .args(args)
        .output()
        .map_err(|err| Error::External {
            command: command.clone(),
            reason: err.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::External {
            command,
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod test {
    use pretty_assertions::assert_eq;
    use std::{collections::BTreeSet, fs, path::PathBuf};

    use super::{decompose, preprocess};
    use crate::{
        graph,
        literal::Clause,
        Error,
    };

    fn work_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tdrs-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn decompose_with_script() {
        let dir = work_dir("decompose");
        let script = dir.join("decomposer.sh");
        // Vertices of the bipartite graph of (x_1 ∨ x_2) are numbered x_1, x_2, c_1.
        fs::write(&script, "printf 's td 1 2 3\\nb 1 1 2 3\\n' > \"$2\"\n").unwrap();

        let graph = graph::bipartite(&[Clause::new([1, 2])]);
        let decomposition = decompose(&graph, &script, 5, &dir, "single").unwrap();

        assert_eq!(
            decomposition.bags,
            vec![BTreeSet::from([
                "x_1".to_owned(),
                "x_2".to_owned(),
                "c_1".to_owned()
            ])]
        );
        assert!(decomposition.edges.is_empty());
        assert!(dir.join("single.gr").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failing_script() {
        let dir = work_dir("failing");
        let script = dir.join("failing.sh");
        fs::write(&script, "echo broken >&2\nexit 3\n").unwrap();

        match preprocess(&script, &dir.join("in"), &dir.join("out")) {
            Err(Error::External { reason, .. }) => assert!(reason.contains("broken")),
            other => panic!("unexpected result {other:?}"),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn preprocess_copies() {
        let dir = work_dir("preprocess");
        let script = dir.join("copy.sh");
        fs::write(&script, "cp \"$1\" \"$2\"\n").unwrap();
        fs::write(dir.join("in.qdimacs"), "p cnf 1 1\n1 0\n").unwrap();

        preprocess(&script, &dir.join("in.qdimacs"), &dir.join("out.qdimacs")).unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("out.qdimacs")).unwrap(),
            "p cnf 1 1\n1 0\n"
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
