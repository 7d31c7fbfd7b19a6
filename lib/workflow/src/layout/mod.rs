//! Automatic layout of workflow graphs.
//!
//! The adapter turns a [`WorkflowGraph`] into an abstract [`LayoutProblem`]
//! (fixed-size boxes plus directed edges), hands it to a [`LayoutEngine`], and
//! writes the resulting placements back onto the graph.
//!
//! Layout is advisory. [`compute_layout`] never returns partial coordinates:
//! when the engine fails, the original positions come back unchanged together
//! with the error so the caller can tell the user.

mod layered;
mod order;
mod position;
mod rank;

pub use layered::LayeredLayout;

use crate::error::LayoutError;
use crate::graph::WorkflowGraph;
use crate::node::{NodeId, Position};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Flow direction of the ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Sources at the top, targets below.
    #[default]
    Down,
    /// Sources on the left.
    Right,
    /// Sources on the right.
    Left,
    /// Sources at the bottom.
    Up,
}

impl LayoutDirection {
    /// Returns true when ranks are stacked vertically.
    #[must_use]
    pub const fn is_vertical(&self) -> bool {
        matches!(self, Self::Down | Self::Up)
    }
}

fn default_spacing() -> f64 {
    50.0
}

fn default_layer_spacing() -> f64 {
    50.0
}

fn default_padding() -> f64 {
    20.0
}

fn default_node_width() -> f64 {
    150.0
}

fn default_node_height() -> f64 {
    50.0
}

fn default_max_sweeps() -> usize {
    24
}

fn default_max_nodes() -> usize {
    2000
}

/// Layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    #[serde(default)]
    pub direction: LayoutDirection,
    /// Gap between neighbouring nodes in the same rank.
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    /// Gap between consecutive ranks.
    #[serde(default = "default_layer_spacing")]
    pub layer_spacing: f64,
    /// Margin around the whole diagram.
    #[serde(default = "default_padding")]
    pub padding: f64,
    /// Footprint used for every node.
    #[serde(default = "default_node_width")]
    pub node_width: f64,
    #[serde(default = "default_node_height")]
    pub node_height: f64,
    /// Upper bound on crossing-reduction sweeps.
    #[serde(default = "default_max_sweeps")]
    pub max_sweeps: usize,
    /// Problems with more nodes than this are refused.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::default(),
            spacing: default_spacing(),
            layer_spacing: default_layer_spacing(),
            padding: default_padding(),
            node_width: default_node_width(),
            node_height: default_node_height(),
            max_sweeps: default_max_sweeps(),
            max_nodes: default_max_nodes(),
        }
    }
}

impl LayoutOptions {
    /// Checks that every distance is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidOptions`] naming the first bad field.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let distances = [
            ("spacing", self.spacing),
            ("layerSpacing", self.layer_spacing),
            ("padding", self.padding),
            ("nodeWidth", self.node_width),
            ("nodeHeight", self.node_height),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidOptions {
                    reason: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// A box to be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: NodeId,
    pub width: f64,
    pub height: f64,
    /// Where the node currently sits; returned unchanged on failure.
    pub position: Position,
}

/// A directed constraint between two boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEdge {
    pub source: NodeId,
    pub target: NodeId,
}

/// The abstract input of a layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutProblem {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutProblem {
    /// Extracts the layout problem from a graph, sizing every node with the
    /// fixed footprint from `options`.
    #[must_use]
    pub fn from_graph(graph: &WorkflowGraph, options: &LayoutOptions) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| LayoutNode {
                id: node.id.clone(),
                width: options.node_width,
                height: options.node_height,
                position: node.position,
            })
            .collect();
        let edges = graph
            .edges()
            .map(|edge| LayoutEdge {
                source: edge.source.clone(),
                target: edge.target.clone(),
            })
            .collect();
        Self { nodes, edges }
    }

    /// Returns the current position of every node as placements.
    #[must_use]
    pub fn original_placements(&self) -> Vec<NodePlacement> {
        self.nodes
            .iter()
            .map(|node| NodePlacement {
                id: node.id.clone(),
                x: node.position.x,
                y: node.position.y,
            })
            .collect()
    }
}

/// Computed top-left corner of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl NodePlacement {
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// A layered layout algorithm.
///
/// Implementations must be deterministic: the same problem and options always
/// produce the same placements.
pub trait LayoutEngine: Send + Sync {
    /// Places every node of `problem`.
    ///
    /// # Errors
    ///
    /// Returns an error if the problem or options are unusable.
    fn compute(
        &self,
        problem: &LayoutProblem,
        options: &LayoutOptions,
    ) -> Result<Vec<NodePlacement>, LayoutError>;
}

/// Placements from a layout pass, plus the error if the pass fell back.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub placements: Vec<NodePlacement>,
    pub error: Option<LayoutError>,
}

impl LayoutResult {
    /// Returns true if the original positions were kept.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    fn fallback(problem: &LayoutProblem, error: LayoutError) -> Self {
        Self {
            placements: problem.original_placements(),
            error: Some(error),
        }
    }
}

/// Runs `engine`, falling back to the original positions on failure.
#[instrument(skip_all, fields(nodes = problem.nodes.len(), edges = problem.edges.len()))]
pub fn compute_layout(
    problem: &LayoutProblem,
    options: &LayoutOptions,
    engine: &dyn LayoutEngine,
) -> LayoutResult {
    match engine.compute(problem, options) {
        Ok(placements) => {
            debug!(placed = placements.len(), "Layout computed");
            LayoutResult {
                placements,
                error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Layout failed, keeping original positions");
            LayoutResult::fallback(problem, e)
        }
    }
}

/// Runs [`compute_layout`] on the blocking thread pool.
///
/// A panicking or cancelled task is reported as [`LayoutError::Aborted`] and
/// falls back like any other failure.
pub async fn compute_layout_async(
    problem: LayoutProblem,
    options: LayoutOptions,
    engine: Arc<dyn LayoutEngine>,
) -> LayoutResult {
    let originals = problem.original_placements();
    let task =
        tokio::task::spawn_blocking(move || compute_layout(&problem, &options, engine.as_ref()));

    match task.await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Layout task did not complete");
            LayoutResult {
                placements: originals,
                error: Some(LayoutError::Aborted {
                    reason: e.to_string(),
                }),
            }
        }
    }
}

/// Writes placements back onto the graph. Placements for nodes the graph no
/// longer has are skipped; returns how many nodes moved.
pub fn apply_placements(graph: &mut WorkflowGraph, placements: &[NodePlacement]) -> usize {
    placements
        .iter()
        .filter(|placement| {
            graph
                .set_position(&placement.id, placement.position())
                .is_ok()
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::node::{Node, NodeKind};

    struct FailingEngine;

    impl LayoutEngine for FailingEngine {
        fn compute(
            &self,
            _problem: &LayoutProblem,
            _options: &LayoutOptions,
        ) -> Result<Vec<NodePlacement>, LayoutError> {
            Err(LayoutError::Aborted {
                reason: "simulated".to_string(),
            })
        }
    }

    struct PanickingEngine;

    impl LayoutEngine for PanickingEngine {
        fn compute(
            &self,
            _problem: &LayoutProblem,
            _options: &LayoutOptions,
        ) -> Result<Vec<NodePlacement>, LayoutError> {
            panic!("engine blew up");
        }
    }

    fn sample_graph() -> WorkflowGraph {
        WorkflowGraph::from_parts(
            vec![
                Node::new("t", NodeKind::Trigger, Position::new(7.0, 3.0)),
                Node::new("m", NodeKind::Email, Position::new(-40.0, 12.5)),
                Node::new("e", NodeKind::End, Position::new(0.0, 0.0)),
            ],
            vec![Edge::new("tm", "t", "m"), Edge::new("me", "m", "e")],
        )
        .expect("valid graph")
    }

    #[test]
    fn defaults_match_canvas_settings() {
        let options = LayoutOptions::default();
        assert_eq!(options.direction, LayoutDirection::Down);
        assert_eq!(options.spacing, 50.0);
        assert_eq!(options.padding, 20.0);
        assert_eq!((options.node_width, options.node_height), (150.0, 50.0));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: LayoutOptions =
            serde_json::from_value(serde_json::json!({ "direction": "right" })).expect("decode");
        assert_eq!(options.direction, LayoutDirection::Right);
        assert_eq!(options.layer_spacing, 50.0);
    }

    #[test]
    fn negative_spacing_is_invalid() {
        let options = LayoutOptions {
            spacing: -1.0,
            ..LayoutOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(LayoutError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn problem_uses_fixed_footprint() {
        let problem = LayoutProblem::from_graph(&sample_graph(), &LayoutOptions::default());
        assert_eq!(problem.nodes.len(), 3);
        assert_eq!(problem.edges.len(), 2);
        assert!(
            problem
                .nodes
                .iter()
                .all(|n| n.width == 150.0 && n.height == 50.0)
        );
    }

    #[test]
    fn failure_returns_original_positions() {
        let graph = sample_graph();
        let problem = LayoutProblem::from_graph(&graph, &LayoutOptions::default());

        let result = compute_layout(&problem, &LayoutOptions::default(), &FailingEngine);

        assert!(result.is_fallback());
        for placement in &result.placements {
            let node = graph.get_node(&placement.id).expect("node");
            assert_eq!(placement.position(), node.position);
        }
    }

    #[test]
    fn layout_is_deterministic() {
        let problem = LayoutProblem::from_graph(&sample_graph(), &LayoutOptions::default());
        let options = LayoutOptions::default();

        let first = compute_layout(&problem, &options, &LayeredLayout);
        let second = compute_layout(&problem, &options, &LayeredLayout);

        assert!(!first.is_fallback());
        assert_eq!(first, second);
    }

    #[test]
    fn apply_skips_unknown_nodes() {
        let mut graph = sample_graph();
        let placements = vec![
            NodePlacement {
                id: NodeId::from("t"),
                x: 1.0,
                y: 2.0,
            },
            NodePlacement {
                id: NodeId::from("gone"),
                x: 9.0,
                y: 9.0,
            },
        ];

        let moved = apply_placements(&mut graph, &placements);

        assert_eq!(moved, 1);
        assert_eq!(
            graph.get_node(&NodeId::from("t")).map(|n| n.position),
            Some(Position::new(1.0, 2.0))
        );
    }

    #[tokio::test]
    async fn async_layout_places_nodes() {
        let problem = LayoutProblem::from_graph(&sample_graph(), &LayoutOptions::default());
        let result =
            compute_layout_async(problem, LayoutOptions::default(), Arc::new(LayeredLayout)).await;
        assert!(result.error.is_none());
        assert_eq!(result.placements.len(), 3);
    }

    #[tokio::test]
    async fn panicking_engine_falls_back() {
        let graph = sample_graph();
        let problem = LayoutProblem::from_graph(&graph, &LayoutOptions::default());
        let expected = problem.original_placements();

        let result =
            compute_layout_async(problem, LayoutOptions::default(), Arc::new(PanickingEngine))
                .await;

        assert!(matches!(result.error, Some(LayoutError::Aborted { .. })));
        assert_eq!(result.placements, expected);
    }
}
