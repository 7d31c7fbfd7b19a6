//! Cycle breaking, rank assignment and long-edge normalisation.

use crate::error::LayoutError;
use petgraph::algo::{greedy_feedback_arc_set, toposort};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashSet;

/// A proper layered graph: every edge joins two consecutive ranks.
///
/// Vertices `0..real` are the input nodes in input order; vertices from
/// `real` on are virtual nodes inserted along edges spanning several ranks.
#[derive(Debug, Clone)]
pub(super) struct Hierarchy {
    pub rank: Vec<usize>,
    pub real: usize,
    /// Neighbours one rank further along the flow.
    pub down: Vec<Vec<usize>>,
    /// Neighbours one rank back.
    pub up: Vec<Vec<usize>>,
}

impl Hierarchy {
    pub fn vertex_count(&self) -> usize {
        self.rank.len()
    }

    pub fn rank_count(&self) -> usize {
        self.rank.iter().max().map_or(0, |r| r + 1)
    }

    pub fn is_virtual(&self, vertex: usize) -> bool {
        vertex >= self.real
    }

    /// Groups vertices by rank, each rank in vertex order.
    pub fn layers(&self) -> Vec<Vec<usize>> {
        let mut layers = vec![Vec::new(); self.rank_count()];
        for (vertex, &rank) in self.rank.iter().enumerate() {
            layers[rank].push(vertex);
        }
        layers
    }

    fn push_vertex(&mut self, rank: usize) -> usize {
        self.rank.push(rank);
        self.down.push(Vec::new());
        self.up.push(Vec::new());
        self.rank.len() - 1
    }

    fn link(&mut self, from: usize, to: usize) {
        self.down[from].push(to);
        self.up[to].push(from);
    }
}

/// Builds the layered graph for `node_count` nodes joined by `edges`
/// (pairs of node positions).
pub(super) fn build(node_count: usize, edges: &[(usize, usize)]) -> Result<Hierarchy, LayoutError> {
    let oriented = break_cycles(node_count, edges);
    let rank = longest_path_ranks(node_count, &oriented)?;

    let mut hierarchy = Hierarchy {
        rank,
        real: node_count,
        down: vec![Vec::new(); node_count],
        up: vec![Vec::new(); node_count],
    };

    for (source, target) in oriented {
        let span = hierarchy.rank[target] - hierarchy.rank[source];
        let mut previous = source;
        for step in 1..span {
            let rank = hierarchy.rank[source] + step;
            let dummy = hierarchy.push_vertex(rank);
            hierarchy.link(previous, dummy);
            previous = dummy;
        }
        hierarchy.link(previous, target);
    }

    Ok(hierarchy)
}

/// Drops self-loops and reverses a greedy feedback arc set so the remaining
/// edges form a DAG.
fn break_cycles(node_count: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(node_count, edges.len());
    for _ in 0..node_count {
        graph.add_node(());
    }
    for &(source, target) in edges {
        if source != target {
            graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
        }
    }

    let reversed: HashSet<EdgeIndex> = greedy_feedback_arc_set(&graph)
        .map(|edge| edge.id())
        .collect();

    graph
        .edge_references()
        .map(|edge| {
            let (source, target) = (edge.source().index(), edge.target().index());
            if reversed.contains(&edge.id()) {
                (target, source)
            } else {
                (source, target)
            }
        })
        .collect()
}

/// Places every node one rank below its deepest predecessor.
fn longest_path_ranks(
    node_count: usize,
    edges: &[(usize, usize)],
) -> Result<Vec<usize>, LayoutError> {
    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(node_count, edges.len());
    for _ in 0..node_count {
        dag.add_node(());
    }
    for &(source, target) in edges {
        dag.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
    }

    let order = toposort(&dag, None).map_err(|_| LayoutError::Cyclic)?;

    let mut rank = vec![0usize; node_count];
    for node in order {
        let next = rank[node.index()] + 1;
        for successor in dag.neighbors(node) {
            let slot = &mut rank[successor.index()];
            *slot = (*slot).max(next);
        }
    }
    Ok(rank)
}
