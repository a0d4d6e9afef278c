use std::fmt::Display;

use crate::literal::{ClauseIdx, NodeId};

/// Stage of the reformulation pipeline in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Decompose,
    Build,
    Write,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Stage::Parse => "parse",
            Stage::Decompose => "decompose",
            Stage::Build => "build",
            Stage::Write => "write",
        };
        write!(f, "{stage}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed decomposition: {0}")]
    MalformedDecomposition(String),

    #[error("bags {} are not reachable from the root", display_nodes(.nodes))]
    UnreachableBags { nodes: Vec<NodeId> },

    #[error("malformed bag entry '{0}', expected 'x_<int>', 'c_<int>' or 'c_<int>_<int>'")]
    MalformedBagEntry(String),

    #[error("malformed variable '{0}', expected 'x_<int>' or 'c_<int>_<int>'")]
    MalformedVariable(String),

    #[error("bag {node} references clause {clause} but there are only {clauses} clauses")]
    MissingClause {
        clause: ClauseIdx,
        node: NodeId,
        clauses: usize,
    },

    #[error("could not parse {what}: {reason}")]
    Parse {
        what: &'static str,
        reason: anyhow::Error,
    },

    #[error("formula has {variables} variables, at most {limit} can be enumerated")]
    TooManyVariables { variables: usize, limit: usize },

    #[error("external command '{command}' failed: {reason}")]
    External { command: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{input}: {stage}: {source}")]
    Stage {
        input: String,
        stage: Stage,
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the input and the pipeline stage to the error.
    #[must_use]
    pub fn in_stage(self, input: &str, stage: Stage) -> Error {
        match self {
            Error::Stage { .. } => self,
            _ => Error::Stage {
                input: input.to_owned(),
                stage,
                source: Box::new(self),
            },
        }
    }

    /// Stage in which the error occurred, if known.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

fn display_nodes(nodes: &[NodeId]) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Error, Stage};
    use crate::literal::NodeId;

    #[test]
    fn stage_wraps_once() {
        let err = Error::UnreachableBags {
            nodes: vec![NodeId(3), NodeId(4)],
        }
        .in_stage("formula.qdimacs", Stage::Build)
        .in_stage("formula.qdimacs", Stage::Write);

        assert_eq!(err.stage(), Some(Stage::Build));
        assert_eq!(
            err.to_string(),
            "formula.qdimacs: build: bags 3, 4 are not reachable from the root"
        );
    }

    #[test]
    fn stage_names() {
        assert_eq!(
            [Stage::Parse, Stage::Decompose, Stage::Build, Stage::Write].map(|stage| stage.to_string()),
            ["parse", "decompose", "build", "write"]
        );
    }
}
