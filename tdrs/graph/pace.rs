//! PACE 2017 `.gr` graphs and `.td` tree decompositions.
use std::{
    collections::{BTreeMap, BTreeSet},
    io::BufRead,
};

use anyhow::{bail, Context};

use crate::{
    decomposition::Decomposition,
    graph::{sorted_edges, Graph, Vertex},
    Error, Result,
};

/// Write `graph` in the `.gr` format. Vertices are numbered from 1 in their
/// sorted order; the returned dictionary maps the numbers back to the vertices.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_graph(
    graph: &Graph,
    writer: &mut dyn std::io::Write,
) -> Result<BTreeMap<usize, Vertex>> {
    let mut vertices: Vec<Vertex> = graph.nodes().collect();
    vertices.sort_unstable();
    let ids: BTreeMap<Vertex, usize> = vertices
        .into_iter()
        .enumerate()
        .map(|(position, vertex)| (vertex, position + 1))
        .collect();

    writeln!(writer, "p tw {} {}", graph.node_count(), graph.edge_count())?;
    for (fst, snd) in sorted_edges(graph) {
        writeln!(writer, "{} {}", ids[&fst], ids[&snd])?;
    }
    writer.flush()?;

    Ok(ids.into_iter().map(|(vertex, id)| (id, vertex)).collect())
}

/// Read a tree decomposition in the `.td` format, translating vertex numbers
/// through `dictionary`. The first bag becomes the root.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the solution line is missing, a line is malformed,
/// a bag mentions a vertex outside of `dictionary`, or an edge mentions an unknown bag.
pub fn read_decomposition(
    reader: &mut dyn BufRead,
    dictionary: &BTreeMap<usize, Vertex>,
) -> Result<Decomposition> {
    parse_decomposition(reader, dictionary).map_err(|reason| Error::Parse {
        what: "tree decomposition",
        reason,
    })
}

fn parse_decomposition(
    reader: &mut dyn BufRead,
    dictionary: &BTreeMap<usize, Vertex>,
) -> anyhow::Result<Decomposition> {
    let mut expected_bags = None;
    let mut bags: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
    let mut edges = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("could not read line {}", line_number + 1))?;
        let tokens: Vec<_> = line.split_whitespace().collect();

        match tokens.as_slice() {
            [] | ["c", ..] => {}
            ["s", "td", count, _width, _vertices] => {
                if expected_bags.is_some() {
                    bail!("duplicate solution line");
                }
                expected_bags = Some(
                    count
                        .parse::<usize>()
                        .with_context(|| format!("invalid bag count '{count}'"))?,
                );
            }
            ["s", ..] => bail!("solution line must be 's td BAGS WIDTH VERTICES'"),
            ["b", id, vertices @ ..] => {
                if expected_bags.is_none() {
                    bail!("bag {id} precedes the solution line");
                }

                let id = id
                    .parse::<usize>()
                    .with_context(|| format!("invalid bag id '{id}'"))?;
                let mut bag = BTreeSet::new();
                for vertex in vertices {
                    let vertex = vertex
                        .parse::<usize>()
                        .with_context(|| format!("invalid vertex '{vertex}' in bag {id}"))?;
                    match dictionary.get(&vertex) {
                        Some(vertex) => bag.insert(vertex.to_string()),
                        None => bail!("bag {id} mentions unknown vertex {vertex}"),
                    };
                }

                if bags.insert(id, bag).is_some() {
                    bail!("duplicate bag {id}");
                }
            }
            [fst, snd] => {
                let fst = fst
                    .parse::<usize>()
                    .with_context(|| format!("invalid edge endpoint '{fst}'"))?;
                let snd = snd
                    .parse::<usize>()
                    .with_context(|| format!("invalid edge endpoint '{snd}'"))?;
                edges.push((fst, snd));
            }
            _ => bail!("unexpected line {}: '{line}'", line_number + 1),
        }
    }

    let Some(expected_bags) = expected_bags else {
        bail!("missing solution line 's td BAGS WIDTH VERTICES'");
    };

    // Bags are numbered from 1 and must be contiguous.
    if bags.len() != expected_bags || bags.keys().copied().ne(1..=expected_bags) {
        bail!(
            "expected bags 1..={expected_bags} but found {} bags",
            bags.len()
        );
    }

    let edges = edges
        .into_iter()
        .map(|(fst, snd)| {
            if fst == 0 || snd == 0 || fst > expected_bags || snd > expected_bags {
                bail!("edge {fst} {snd} mentions an unknown bag");
            }
            Ok((fst - 1, snd - 1))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Decomposition::new(bags.into_values().collect(), edges))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::{collections::BTreeSet, io::BufReader};

    use super::{read_decomposition, write_graph};
    use crate::{
        graph::{bipartite, Vertex},
        literal::{Clause, ClauseIdx},
    };

    fn bag(entries: &[&str]) -> BTreeSet<String> {
        entries.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn write_bipartite_graph() {
        let graph = bipartite(&[Clause::new([1, 2]), Clause::new([-1, 3])]);
        let mut buffer = Vec::<u8>::new();
        let dictionary = write_graph(&graph, &mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "p tw 5 4\n1 4\n1 5\n2 4\n3 5\n"
        );
        assert_eq!(dictionary[&1], Vertex::Variable(1));
        assert_eq!(dictionary[&4], Vertex::Clause(ClauseIdx(1)));
        assert_eq!(dictionary[&5], Vertex::Clause(ClauseIdx(2)));
    }

    #[test]
    fn read_flowcutter_output() {
        let graph = bipartite(&[Clause::new([1, 2]), Clause::new([-1, 3])]);
        let dictionary = write_graph(&graph, &mut Vec::<u8>::new()).unwrap();

        let contents = "c produced by a decomposer
s td 3 2 5
b 1 1 4 5
b 2 1 2 4
b 3 1 3 5
1 2
1 3
";
        let mut reader = BufReader::new(contents.as_bytes());
        let decomposition = read_decomposition(&mut reader, &dictionary).unwrap();

        assert_eq!(
            decomposition.bags,
            vec![
                bag(&["x_1", "c_1", "c_2"]),
                bag(&["x_1", "x_2", "c_1"]),
                bag(&["x_1", "x_3", "c_2"]),
            ]
        );
        assert_eq!(decomposition.edges, vec![(0, 1), (0, 2)]);
        assert_eq!(decomposition.width(), 2);
    }

    #[test]
    fn malformed_decompositions() {
        let graph = bipartite(&[Clause::new([1, 2])]);
        let dictionary = write_graph(&graph, &mut Vec::<u8>::new()).unwrap();

        for contents in [
            "b 1 1 2\n",
            "s td 1 1 3\nb 1 7\n",
            "s td 2 1 3\nb 1 1 3\n",
            "s td 1 1 3\nb 1 1 3\n1 2\n",
            "s td 1 1 3\nb 1 x\n",
            "s td 1 1 3\ns td 1 1 3\nb 1 1\n",
        ] {
            let mut reader = BufReader::new(contents.as_bytes());
            assert!(
                read_decomposition(&mut reader, &dictionary).is_err(),
                "accepted '{contents}'"
            );
        }
    }
}
