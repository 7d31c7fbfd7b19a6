//! Editing sessions.
//!
//! An [`EditorSession`] is the single entry point the canvas uses to change a
//! workflow graph. It owns the graph for one workflow and serialises work on
//! it:
//!
//! ```text
//! Idle --(add/remove/connect/insert/...)--> Mutating --> Idle
//! Idle --(begin_layout)--> Layouting --(finish_layout)--> Idle
//! ```
//!
//! While a layout is pending every mutation is refused with
//! [`EditorError::Busy`]. Each successful change bumps [`EditorSession::version`];
//! a layout result computed against an older version is discarded.

use crate::edge::{Edge, EdgeId};
use crate::error::{EditorError, GraphError, LayoutError};
use crate::graph::{Insertion, RemovedNode, WorkflowGraph};
use crate::layout::{
    LayoutEngine, LayoutOptions, LayoutProblem, LayoutResult, apply_placements,
    compute_layout_async,
};
use crate::node::{Node, NodeData, NodeId, NodeKind, Position};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a session is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorState {
    #[default]
    Idle,
    Mutating,
    Layouting,
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Mutating => write!(f, "mutating"),
            Self::Layouting => write!(f, "layouting"),
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A short message for the user about the outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The value of a successful operation and the notice to show for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    pub value: T,
    pub notice: Notice,
}

impl<T> Applied<T> {
    fn new(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            notice: Notice::success(message),
        }
    }
}

impl EditorError {
    /// Returns the notice to show the user for this error.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Busy { .. } => {
                Notice::warning("Another change is still being applied, try again shortly")
            }
            Self::Rejected(err) => Notice::error(format!("Change rejected: {err}")),
        }
    }
}

/// A pending layout pass, tied to the graph version it was taken from.
#[derive(Debug, Clone)]
pub struct LayoutTicket {
    version: u64,
    problem: LayoutProblem,
    options: LayoutOptions,
}

impl LayoutTicket {
    /// The graph version the layout was requested for.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn problem(&self) -> &LayoutProblem {
        &self.problem
    }

    /// Runs the layout on the blocking pool.
    pub async fn compute(&self, engine: Arc<dyn LayoutEngine>) -> LayoutResult {
        compute_layout_async(self.problem.clone(), self.options.clone(), engine).await
    }
}

/// How a finished layout pass was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutOutcome {
    /// New positions were written to the graph.
    Applied { moved: usize },
    /// The engine failed; positions are unchanged.
    FellBack(LayoutError),
    /// The graph changed while the layout ran; the result was dropped.
    Stale,
}

impl LayoutOutcome {
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Applied { .. } => Notice::success("Layout applied"),
            Self::FellBack(err) => {
                Notice::warning(format!("Auto layout failed, positions unchanged: {err}"))
            }
            Self::Stale => Notice::warning("Workflow changed during layout, result discarded"),
        }
    }
}

/// The editing session for one workflow.
#[derive(Debug, Clone)]
pub struct EditorSession {
    graph: WorkflowGraph,
    version: u64,
    state: EditorState,
    options: LayoutOptions,
}

impl EditorSession {
    #[must_use]
    pub fn new(graph: WorkflowGraph) -> Self {
        Self::with_options(graph, LayoutOptions::default())
    }

    #[must_use]
    pub fn with_options(graph: WorkflowGraph, options: LayoutOptions) -> Self {
        Self {
            graph,
            version: 0,
            state: EditorState::Idle,
            options,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        self.state
    }

    #[must_use]
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Changes the layout settings used by later layout passes.
    pub fn set_options(&mut self, options: LayoutOptions) {
        self.options = options;
    }

    /// Where [`Self::add_node`] puts a node when no position is given.
    #[must_use]
    pub fn next_palette_position(&self) -> Position {
        Position::new(100.0 + 200.0 * self.graph.node_count() as f64, 200.0)
    }

    /// Adds a node of `kind` with a generated ID.
    ///
    /// Without a position the node goes to the next palette slot
    /// (`x = 100 + 200 * n`, `y = 200`).
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Busy`] while a layout is pending.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: Option<String>,
        position: Option<Position>,
    ) -> Result<Applied<NodeId>, EditorError> {
        let position = position.unwrap_or_else(|| self.next_palette_position());
        let mut node = Node::new(self.fresh_node_id(kind), kind, position);
        if let Some(label) = label {
            node.label = label;
        }
        self.add_configured_node(node)
    }

    /// Adds a fully specified node.
    ///
    /// # Errors
    ///
    /// Returns an error while busy or if the ID is already taken.
    pub fn add_configured_node(&mut self, node: Node) -> Result<Applied<NodeId>, EditorError> {
        let kind = node.kind();
        let node_id = self.mutate(|graph| graph.add_node(node))?;
        debug!(node_id = %node_id, kind = %kind, version = self.version, "Node added");
        Ok(Applied::new(node_id, format!("{} node added", kind.default_label())))
    }

    /// Removes a node and its edges.
    ///
    /// # Errors
    ///
    /// Returns an error while busy or if the node does not exist.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<Applied<RemovedNode>, EditorError> {
        let removed = self.mutate(|graph| graph.remove_node(node_id))?;
        debug!(
            node_id = %node_id,
            edges_removed = removed.edges.len(),
            version = self.version,
            "Node removed"
        );
        Ok(Applied::new(removed, "Node deleted"))
    }

    /// Connects two nodes.
    ///
    /// # Errors
    ///
    /// Returns an error while busy or if either endpoint does not exist.
    pub fn connect(
        &mut self,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<Applied<EdgeId>, EditorError> {
        let edge_id = self.mutate(|graph| graph.connect(source, target))?;
        debug!(edge_id = %edge_id, source = %source, target = %target, "Nodes connected");
        Ok(Applied::new(edge_id, "Nodes connected"))
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns an error while busy or if the edge does not exist.
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Result<Applied<Edge>, EditorError> {
        let edge = self.mutate(|graph| graph.disconnect(edge_id))?;
        debug!(edge_id = %edge_id, "Edge removed");
        Ok(Applied::new(edge, "Connection removed"))
    }

    /// Inserts a new node of `kind` on an existing edge.
    ///
    /// # Errors
    ///
    /// Returns an error while busy or if the edge does not exist.
    pub fn insert_on_edge(
        &mut self,
        edge_id: &EdgeId,
        kind: NodeKind,
        label: Option<String>,
        position: Option<Position>,
    ) -> Result<Applied<Insertion>, EditorError> {
        let mut node = Node::new(self.fresh_node_id(kind), kind, Position::default());
        if let Some(label) = label {
            node.label = label;
        }
        let insertion = self.mutate(|graph| graph.insert_node_on_edge(edge_id, node, position))?;
        debug!(
            edge_id = %edge_id,
            node_id = %insertion.node_id,
            version = self.version,
            "Node inserted on edge"
        );
        Ok(Applied::new(
            insertion,
            format!("{} node inserted", kind.default_label()),
        ))
    }

    /// Moves a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns an error while busy or if the node does not exist.
    pub fn move_node(
        &mut self,
        node_id: &NodeId,
        position: Position,
    ) -> Result<Applied<()>, EditorError> {
        self.mutate(|graph| graph.set_position(node_id, position))?;
        Ok(Applied::new((), "Node moved"))
    }

    /// Relabels a node and/or replaces its `data` payload.
    ///
    /// # Errors
    ///
    /// Returns an error while busy, if the node does not exist, or if the
    /// data is for another kind.
    pub fn update_node(
        &mut self,
        node_id: &NodeId,
        label: Option<String>,
        data: Option<NodeData>,
    ) -> Result<Applied<()>, EditorError> {
        self.mutate(|graph| graph.update_node(node_id, label, data))?;
        debug!(node_id = %node_id, version = self.version, "Node updated");
        Ok(Applied::new((), "Node updated"))
    }

    /// Replaces the whole graph, e.g. after reloading the workflow.
    ///
    /// Always accepted. Any pending layout becomes stale.
    pub fn replace_graph(&mut self, graph: WorkflowGraph) -> Applied<()> {
        self.graph = graph;
        self.version += 1;
        info!(version = self.version, state = %self.state, "Graph replaced");
        Applied::new((), "Workflow reloaded")
    }

    /// Starts a layout pass for the current graph.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Busy`] if another operation is in flight.
    pub fn begin_layout(&mut self) -> Result<LayoutTicket, EditorError> {
        self.ensure_idle()?;
        self.state = EditorState::Layouting;
        debug!(version = self.version, "Layout started");
        Ok(LayoutTicket {
            version: self.version,
            problem: LayoutProblem::from_graph(&self.graph, &self.options),
            options: self.options.clone(),
        })
    }

    /// Completes a layout pass started with [`Self::begin_layout`].
    pub fn finish_layout(&mut self, ticket: LayoutTicket, result: LayoutResult) -> LayoutOutcome {
        if self.state == EditorState::Layouting {
            self.state = EditorState::Idle;
        }

        if ticket.version != self.version {
            warn!(
                requested = ticket.version,
                current = self.version,
                "Discarding stale layout"
            );
            return LayoutOutcome::Stale;
        }

        if let Some(err) = result.error {
            return LayoutOutcome::FellBack(err);
        }

        let moved = apply_placements(&mut self.graph, &result.placements);
        self.version += 1;
        info!(moved, version = self.version, "Layout applied");
        LayoutOutcome::Applied { moved }
    }

    /// Runs a full layout pass with `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Busy`] if another operation is in flight.
    pub async fn auto_layout(
        &mut self,
        engine: Arc<dyn LayoutEngine>,
    ) -> Result<Applied<LayoutOutcome>, EditorError> {
        let ticket = self.begin_layout()?;
        let result = ticket.compute(engine).await;
        let outcome = self.finish_layout(ticket, result);
        let notice = outcome.notice();
        Ok(Applied {
            value: outcome,
            notice,
        })
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut WorkflowGraph) -> Result<T, GraphError>,
    ) -> Result<T, EditorError> {
        self.ensure_idle()?;
        self.state = EditorState::Mutating;
        let result = op(&mut self.graph);
        self.state = EditorState::Idle;

        let value = result?;
        self.version += 1;
        Ok(value)
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        match self.state {
            EditorState::Idle => Ok(()),
            state => Err(EditorError::Busy { state }),
        }
    }

    fn fresh_node_id(&self, kind: NodeKind) -> NodeId {
        loop {
            let id = NodeId::generate(kind);
            if !self.graph.contains_node(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayeredLayout, NodePlacement};

    struct BrokenEngine;

    impl LayoutEngine for BrokenEngine {
        fn compute(
            &self,
            _problem: &LayoutProblem,
            _options: &LayoutOptions,
        ) -> Result<Vec<NodePlacement>, LayoutError> {
            Err(LayoutError::Cyclic)
        }
    }

    fn skeleton_session() -> EditorSession {
        let graph = WorkflowGraph::from_parts(
            vec![
                Node::new("trigger-1", NodeKind::Trigger, Position::new(250.0, 50.0)),
                Node::new("end-1", NodeKind::End, Position::new(250.0, 300.0)),
            ],
            vec![Edge::new("e1-2", "trigger-1", "end-1")],
        )
        .expect("valid skeleton");
        EditorSession::new(graph)
    }

    #[test]
    fn add_node_uses_palette_slot() {
        let mut session = skeleton_session();

        let applied = session
            .add_node(NodeKind::Email, None, None)
            .expect("added");

        let node = session.graph().get_node(&applied.value).expect("node");
        assert_eq!(node.position, Position::new(500.0, 200.0));
        assert_eq!(node.label, "Email");
        assert!(applied.value.as_str().starts_with("email-"));
        assert_eq!(applied.notice.level, NoticeLevel::Success);
        assert_eq!(session.version(), 1);
    }

    #[test]
    fn rejected_change_keeps_version() {
        let mut session = skeleton_session();

        let err = session
            .connect(&"trigger-1".into(), &"missing".into())
            .expect_err("rejected");

        assert!(matches!(err, EditorError::Rejected(GraphError::DanglingEdge { .. })));
        assert_eq!(err.notice().level, NoticeLevel::Error);
        assert_eq!(session.version(), 0);
        assert_eq!(session.state(), EditorState::Idle);
    }

    #[test]
    fn insert_on_edge_splits_connection() {
        let mut session = skeleton_session();

        let applied = session
            .insert_on_edge(&"e1-2".into(), NodeKind::Delay, Some("Wait".to_string()), None)
            .expect("inserted");

        let graph = session.graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let node = graph.get_node(&applied.value.node_id).expect("node");
        assert_eq!(node.label, "Wait");
        assert_eq!(node.position, Position::new(250.0, 175.0));
    }

    #[test]
    fn remove_node_cascades() {
        let mut session = skeleton_session();

        let applied = session.remove_node(&"end-1".into()).expect("removed");

        assert_eq!(applied.value.edges.len(), 1);
        assert_eq!(session.graph().edge_count(), 0);
    }

    #[test]
    fn mutations_are_refused_while_layouting() {
        let mut session = skeleton_session();
        let _ticket = session.begin_layout().expect("begin");

        let err = session
            .add_node(NodeKind::Email, None, None)
            .expect_err("busy");

        assert_eq!(
            err,
            EditorError::Busy {
                state: EditorState::Layouting
            }
        );
        assert_eq!(err.notice().level, NoticeLevel::Warning);
        assert!(session.begin_layout().is_err());
        assert_eq!(session.graph().node_count(), 2);
    }

    #[tokio::test]
    async fn layout_applies_positions() {
        let mut session = skeleton_session();

        let applied = session
            .auto_layout(Arc::new(LayeredLayout))
            .await
            .expect("layout");

        assert_eq!(applied.value, LayoutOutcome::Applied { moved: 2 });
        assert_eq!(session.state(), EditorState::Idle);
        let trigger = session.graph().get_node(&"trigger-1".into()).expect("node");
        assert_eq!(trigger.position, Position::new(20.0, 20.0));
    }

    #[tokio::test]
    async fn failed_layout_keeps_positions() {
        let mut session = skeleton_session();
        let before = session.graph().positions();

        let applied = session
            .auto_layout(Arc::new(BrokenEngine))
            .await
            .expect("layout");

        assert_eq!(applied.value, LayoutOutcome::FellBack(LayoutError::Cyclic));
        assert_eq!(applied.notice.level, NoticeLevel::Warning);
        assert_eq!(session.graph().positions(), before);
        assert_eq!(session.version(), 0);
    }

    #[tokio::test]
    async fn layout_is_discarded_after_reload() {
        let mut session = skeleton_session();
        let ticket = session.begin_layout().expect("begin");
        let result = ticket.compute(Arc::new(LayeredLayout)).await;

        let reloaded = session.graph().clone();
        let before = reloaded.positions();
        session.replace_graph(reloaded);

        let outcome = session.finish_layout(ticket, result);

        assert_eq!(outcome, LayoutOutcome::Stale);
        assert_eq!(session.state(), EditorState::Idle);
        assert_eq!(session.graph().positions(), before);
    }
}
