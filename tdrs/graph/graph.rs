use std::{fmt::Display, str::FromStr};

use petgraph::graphmap::UnGraphMap;

use crate::{
    literal::{Clause, ClauseIdx},
    Error,
};

/// Vertex of a primal or bipartite graph, also used for the entries of decomposition bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vertex {
    /// Problem variable `x_<idx>`.
    Variable(u32),
    /// Clause `c_<idx>`.
    Clause(ClauseIdx),
}

impl Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vertex::Variable(idx) => write!(f, "x_{idx}"),
            Vertex::Clause(idx) => write!(f, "c_{idx}"),
        }
    }
}

impl FromStr for Vertex {
    type Err = Error;

    /// Parse `x_<int>`, `c_<int>`, or a clause-variable name `c_<int>_<int>`.
    /// The node number of a clause-variable name is ignored.
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        fn index(idx: &str, entry: &str) -> Result<u32, Error> {
            idx.parse()
                .map_err(|_| Error::MalformedBagEntry(entry.to_owned()))
        }

        let parts: Vec<_> = entry.trim().split('_').collect();
        match parts.as_slice() {
            ["x", idx] => Ok(Vertex::Variable(index(idx, entry)?)),
            ["c", idx] => Ok(Vertex::Clause(ClauseIdx(index(idx, entry)?))),
            ["c", idx, node] => {
                index(node, entry)?;
                Ok(Vertex::Clause(ClauseIdx(index(idx, entry)?)))
            }
            _ => Err(Error::MalformedBagEntry(entry.to_owned())),
        }
    }
}

/// Undirected graph over variables and clauses.
pub type Graph = UnGraphMap<Vertex, ()>;

/// Primal graph of the formula: variables are adjacent when they share a clause.
#[must_use]
pub fn primal(clauses: &[Clause]) -> Graph {
    let mut graph = Graph::new();
    for clause in clauses {
        let variables: Vec<_> = clause.variables().into_iter().collect();
        for (position, fst) in variables.iter().enumerate() {
            graph.add_node(Vertex::Variable(*fst));
            for snd in &variables[position + 1..] {
                graph.add_edge(Vertex::Variable(*fst), Vertex::Variable(*snd), ());
            }
        }
    }
    graph
}

/// Bipartite (incidence) graph of the formula: clause `c_j` is adjacent to
/// every variable it mentions. The empty clause is an isolated vertex.
#[must_use]
pub fn bipartite(clauses: &[Clause]) -> Graph {
    let mut graph = Graph::new();
    for (clause_idx, clause) in (1..).map(ClauseIdx).zip(clauses) {
        graph.add_node(Vertex::Clause(clause_idx));
        for variable in clause.variables() {
            graph.add_edge(Vertex::Clause(clause_idx), Vertex::Variable(variable), ());
        }
    }
    graph
}

/// Every edge once, with the smaller vertex first, in sorted order.
#[must_use]
pub fn sorted_edges(graph: &Graph) -> Vec<(Vertex, Vertex)> {
    let mut edges: Vec<_> = graph
        .all_edges()
        .map(|(fst, snd, _)| (fst.min(snd), fst.max(snd)))
        .collect();
    edges.sort_unstable();
    edges
}
