//! Property-based tests for graph mutations and layout using proptest.
//!
//! Generated graphs have up to eight nodes of any kind and edges between any
//! two of them, so self-loops, parallel edges and cycles all show up.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::graph::{Duplicate, WorkflowGraph};
use crate::layout::{LayeredLayout, LayoutEngine, LayoutOptions, LayoutProblem};
use crate::node::{Node, NodeId, NodeKind, Position};

fn kind_strategy() -> impl Strategy<Value = NodeKind> {
    prop::sample::select(NodeKind::ALL.to_vec())
}

fn position_strategy() -> impl Strategy<Value = Position> {
    (-50i32..50, -50i32..50).prop_map(|(x, y)| Position::new(f64::from(x) * 10.0, f64::from(y) * 10.0))
}

fn build(nodes: Vec<(NodeKind, Position)>, edges: Vec<(usize, usize)>) -> WorkflowGraph {
    let nodes = nodes
        .into_iter()
        .enumerate()
        .map(|(i, (kind, position))| Node::new(format!("n{i}"), kind, position))
        .collect();
    let edges = edges
        .into_iter()
        .enumerate()
        .map(|(i, (s, t))| Edge::new(format!("e{i}"), format!("n{s}"), format!("n{t}")))
        .collect();
    WorkflowGraph::from_parts(nodes, edges).expect("generated graph is consistent")
}

/// Any graph: edges may join any pair, a node to itself included.
fn graph_strategy() -> impl Strategy<Value = WorkflowGraph> {
    prop::collection::vec((kind_strategy(), position_strategy()), 1..8).prop_flat_map(|nodes| {
        let n = nodes.len();
        prop::collection::vec((0..n, 0..n), 0..16)
            .prop_map(move |edges| build(nodes.clone(), edges))
    })
}

/// Graphs whose edges only run from lower to higher node numbers.
fn acyclic_graph_strategy() -> impl Strategy<Value = WorkflowGraph> {
    prop::collection::vec((kind_strategy(), position_strategy()), 2..8).prop_flat_map(|nodes| {
        let n = nodes.len();
        prop::collection::vec((0..n, 0..n), 1..16).prop_map(move |pairs| {
            let edges = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect();
            build(nodes.clone(), edges)
        })
    })
}

fn node_ids(graph: &WorkflowGraph) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = graph.nodes().map(|n| n.id.clone()).collect();
    ids.sort();
    ids
}

fn edge_ids(graph: &WorkflowGraph) -> Vec<EdgeId> {
    let mut ids: Vec<EdgeId> = graph.edges().map(|e| e.id.clone()).collect();
    ids.sort();
    ids
}

/// Multiset of `(source, target)` pairs.
fn endpoint_counts(graph: &WorkflowGraph) -> HashMap<(NodeId, NodeId), usize> {
    let mut counts = HashMap::new();
    for edge in graph.edges() {
        *counts
            .entry((edge.source.clone(), edge.target.clone()))
            .or_insert(0) += 1;
    }
    counts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn removing_a_node_removes_exactly_its_edges(graph in graph_strategy(), pick in any::<prop::sample::Index>()) {
        let ids = node_ids(&graph);
        let victim = ids[pick.index(ids.len())].clone();
        let incident: HashSet<EdgeId> = graph
            .edges()
            .filter(|e| e.touches(&victim))
            .map(|e| e.id.clone())
            .collect();

        let mut after = graph.clone();
        let removed = after.remove_node(&victim).unwrap();

        prop_assert_eq!(&removed.node.id, &victim);
        let removed_ids: HashSet<EdgeId> = removed.edges.iter().map(|e| e.id.clone()).collect();
        prop_assert_eq!(removed.edges.len(), removed_ids.len());
        prop_assert_eq!(&removed_ids, &incident);
        prop_assert_eq!(after.node_count(), graph.node_count() - 1);
        prop_assert_eq!(after.edge_count(), graph.edge_count() - incident.len());
        prop_assert!(!after.contains_node(&victim));
        for edge in after.edges() {
            prop_assert!(!edge.touches(&victim));
            prop_assert!(after.contains_node(&edge.source));
            prop_assert!(after.contains_node(&edge.target));
        }
    }

    #[test]
    fn inserting_on_an_edge_splits_it(
        graph in graph_strategy(),
        pick in any::<prop::sample::Index>(),
        kind in kind_strategy()
    ) {
        let edges = edge_ids(&graph);
        prop_assume!(!edges.is_empty());
        let split = edges[pick.index(edges.len())].clone();
        let original = graph.get_edge(&split).cloned().unwrap();

        let mut after = graph.clone();
        let insertion = after
            .insert_node_on_edge(&split, Node::new("inserted", kind, Position::default()), None)
            .unwrap();

        prop_assert_eq!(after.node_count(), graph.node_count() + 1);
        prop_assert_eq!(after.edge_count(), graph.edge_count() + 1);
        prop_assert!(after.get_edge(&split).is_none());
        prop_assert_eq!(&insertion.removed, &original);

        let upstream = after.get_edge(&insertion.upstream).unwrap();
        let downstream = after.get_edge(&insertion.downstream).unwrap();
        prop_assert_eq!(&upstream.source, &original.source);
        prop_assert_eq!(&upstream.target, &insertion.node_id);
        prop_assert_eq!(&downstream.source, &insertion.node_id);
        prop_assert_eq!(&downstream.target, &original.target);

        for edge in graph.edges().filter(|e| e.id != split) {
            prop_assert_eq!(after.get_edge(&edge.id), Some(edge));
        }
    }

    #[test]
    fn duplicate_is_isomorphic_with_fresh_ids(graph in graph_strategy()) {
        let Duplicate { graph: copy, mapping } = graph.duplicate();

        prop_assert_eq!(copy.node_count(), graph.node_count());
        prop_assert_eq!(copy.edge_count(), graph.edge_count());
        prop_assert_eq!(mapping.nodes.len(), graph.node_count());
        prop_assert_eq!(mapping.edges.len(), graph.edge_count());

        for node in graph.nodes() {
            prop_assert!(!copy.contains_node(&node.id));
            let copied = copy.get_node(&mapping.nodes[&node.id]).unwrap();
            prop_assert_eq!(copied.kind(), node.kind());
            prop_assert_eq!(&copied.label, &node.label);
            prop_assert_eq!(copied.position, node.position);
            prop_assert_eq!(&copied.config, &node.config);
        }
        for edge in graph.edges() {
            prop_assert!(copy.get_edge(&edge.id).is_none());
        }

        let mapped: HashMap<(NodeId, NodeId), usize> = endpoint_counts(&graph)
            .into_iter()
            .map(|((s, t), count)| ((mapping.nodes[&s].clone(), mapping.nodes[&t].clone()), count))
            .collect();
        prop_assert_eq!(mapped, endpoint_counts(&copy));
    }

    #[test]
    fn connecting_to_a_missing_node_changes_nothing(
        graph in graph_strategy(),
        pick in any::<prop::sample::Index>(),
        outgoing in any::<bool>()
    ) {
        let ids = node_ids(&graph);
        let present = ids[pick.index(ids.len())].clone();
        let missing = NodeId::from("missing");
        let before = serde_json::to_value(&graph).unwrap();

        let mut after = graph.clone();
        let result = if outgoing {
            after.connect(&present, &missing)
        } else {
            after.connect(&missing, &present)
        };

        let rejected = matches!(result, Err(GraphError::DanglingEdge { .. }));
        prop_assert!(rejected);
        prop_assert_eq!(&after, &graph);
        prop_assert_eq!(serde_json::to_value(&after).unwrap(), before);
    }

    #[test]
    fn layout_places_every_node_the_same_way_twice(graph in graph_strategy()) {
        let options = LayoutOptions::default();
        let problem = LayoutProblem::from_graph(&graph, &options);

        let first = LayeredLayout.compute(&problem, &options).unwrap();
        let second = LayeredLayout.compute(&problem, &options).unwrap();
        prop_assert_eq!(&first, &second);

        let placed: HashSet<NodeId> = first.iter().map(|p| p.id.clone()).collect();
        prop_assert_eq!(first.len(), graph.node_count());
        prop_assert_eq!(placed, node_ids(&graph).into_iter().collect::<HashSet<_>>());
        for placement in &first {
            prop_assert!(placement.x.is_finite() && placement.y.is_finite());
            prop_assert!(placement.x >= options.padding && placement.y >= options.padding);
        }
    }

    #[test]
    fn layout_ranks_sources_above_targets(graph in acyclic_graph_strategy()) {
        let options = LayoutOptions::default();
        let problem = LayoutProblem::from_graph(&graph, &options);
        let placements = LayeredLayout.compute(&problem, &options).unwrap();
        let y: HashMap<NodeId, f64> = placements.into_iter().map(|p| (p.id, p.y)).collect();

        for edge in graph.edges() {
            prop_assert!(y[&edge.source] < y[&edge.target], "{} -> {}", edge.source, edge.target);
        }
    }
}
