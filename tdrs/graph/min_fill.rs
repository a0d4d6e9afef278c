//! Tree decompositions from the min-fill elimination heuristic.
use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::{
    decomposition::Decomposition,
    graph::{Graph, Vertex},
};

/// Vertex whose elimination adds the fewest fill edges, `None` once the
/// remaining graph is a clique. Ties go to the vertex of smaller degree,
/// then to the smaller vertex.
fn min_fill_vertex(graph: &Graph) -> Option<Vertex> {
    let mut by_degree: Vec<(Vertex, BTreeSet<Vertex>)> = graph
        .nodes()
        .map(|vertex| (vertex, graph.neighbors(vertex).collect()))
        .collect();
    by_degree.sort_by(|(fst, fst_neighbours), (snd, snd_neighbours)| {
        fst_neighbours
            .len()
            .cmp(&snd_neighbours.len())
            .then(fst.cmp(snd))
    });

    let (_, min_neighbours) = by_degree.first()?;
    if min_neighbours.len() + 1 == graph.node_count() {
        return None;
    }

    let mut best: Option<(usize, Vertex)> = None;
    for (vertex, neighbours) in by_degree {
        let mut fill = 0;
        for neighbour in &neighbours {
            fill += neighbours
                .iter()
                .filter(|other| *other != neighbour && !graph.contains_edge(*neighbour, **other))
                .count();
        }
        // Every missing edge was counted from both of its endpoints.
        let fill = fill / 2;

        if fill == 0 {
            return Some(vertex);
        }

        match best {
            Some((best_fill, _)) if best_fill <= fill => {}
            _ => best = Some((fill, vertex)),
        }
    }

    best.map(|(_, vertex)| vertex)
}

/// Compute a tree decomposition of `graph` by eliminating vertices in the
/// min-fill order.
///
/// The clique left over after the elimination becomes the root bag. Every
/// eliminated vertex then gets a bag with its neighbours at elimination time,
/// attached to the first bag that already holds all of those neighbours.
#[must_use]
#[instrument(skip_all, fields(vertices = graph.node_count(), edges = graph.edge_count()))]
pub fn decompose(graph: &Graph) -> Decomposition {
    let mut graph = graph.clone();
    let mut eliminated = Vec::new();

    while let Some(vertex) = min_fill_vertex(&graph) {
        let neighbours: BTreeSet<Vertex> = graph.neighbors(vertex).collect();
        graph.remove_node(vertex);
        for fst in &neighbours {
            for snd in &neighbours {
                if fst < snd {
                    graph.add_edge(*fst, *snd, ());
                }
            }
        }
        eliminated.push((vertex, neighbours));
    }

    let mut bags: Vec<BTreeSet<Vertex>> = vec![graph.nodes().collect()];
    let mut edges = Vec::new();

    while let Some((vertex, mut neighbours)) = eliminated.pop() {
        let parent = bags
            .iter()
            .position(|bag| neighbours.is_subset(bag))
            .unwrap_or(0);

        neighbours.insert(vertex);
        bags.push(neighbours);
        edges.push((parent, bags.len() - 1));
    }

    let decomposition = Decomposition::new(
        bags.into_iter()
            .map(|bag| bag.iter().map(ToString::to_string).collect())
            .collect(),
        edges,
    );
    debug!(
        bags = decomposition.bags.len(),
        width = decomposition.width(),
        "computed min-fill decomposition"
    );
    decomposition
}

/// Width of the min-fill decomposition of `graph`.
#[must_use]
pub fn width(graph: &Graph) -> usize {
    decompose(graph).width()
}
