//! Error types for the workflow crate.
//!
//! - `GraphError`: graph operations and decoding (nodes, edges, invariants)
//! - `LayoutError`: the automatic layout pass
//! - `EditorError`: editing-session operations (wraps `GraphError`)
//!
//! None of these are fatal: the editing session stays usable after any of
//! them, and callers attach workflow-level context themselves.

use crate::edge::EdgeId;
use crate::editor::EditorState;
use crate::node::{NodeId, NodeKind};
use std::fmt;

/// Errors from graph operations.
///
/// A failed operation leaves the graph exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// A node with this ID already exists.
    DuplicateNode { node_id: NodeId },
    /// An edge with this ID already exists.
    DuplicateEdge { edge_id: EdgeId },
    /// An edge references a node that is not in the graph.
    DanglingEdge { edge_id: EdgeId, node_id: NodeId },
    /// A configuration of another kind was supplied for a node.
    KindMismatch {
        node_id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },
    /// A node's `data` payload could not be decoded.
    InvalidNodeData { node_id: NodeId, reason: String },
    /// The workflow has no trigger node.
    MissingTrigger,
    /// A trigger node has an incoming edge.
    TriggerHasIncoming { node_id: NodeId },
    /// An end node has an outgoing edge.
    EndHasOutgoing { node_id: NodeId },
    /// Graph contains cycles.
    CycleDetected,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::DuplicateNode { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::DuplicateEdge { edge_id } => write!(f, "duplicate edge id: {edge_id}"),
            Self::DanglingEdge { edge_id, node_id } => {
                write!(f, "edge {edge_id} references missing node {node_id}")
            }
            Self::KindMismatch {
                node_id,
                expected,
                found,
            } => write!(
                f,
                "node {node_id} is a {expected} node but {found} configuration was given"
            ),
            Self::InvalidNodeData { node_id, reason } => {
                write!(f, "invalid data for node {node_id}: {reason}")
            }
            Self::MissingTrigger => write!(f, "workflow has no trigger node"),
            Self::TriggerHasIncoming { node_id } => {
                write!(f, "trigger node {node_id} has incoming edges")
            }
            Self::EndHasOutgoing { node_id } => {
                write!(f, "end node {node_id} has outgoing edges")
            }
            Self::CycleDetected => write!(f, "graph contains cycles"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from the automatic layout pass.
///
/// Layout is advisory: callers fall back to the previous positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// An edge endpoint is not among the layout nodes.
    UnknownEndpoint { node_id: NodeId },
    /// A node footprint is negative or not finite.
    InvalidDimension { node_id: NodeId },
    /// A spacing or padding option is negative or not finite.
    InvalidOptions { reason: String },
    /// The problem exceeds the configured node limit.
    TooLarge { nodes: usize, limit: usize },
    /// Rank assignment found a cycle after cycle breaking.
    Cyclic,
    /// The layout task did not complete.
    Aborted { reason: String },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEndpoint { node_id } => {
                write!(f, "layout edge references unknown node {node_id}")
            }
            Self::InvalidDimension { node_id } => {
                write!(f, "node {node_id} has an invalid size")
            }
            Self::InvalidOptions { reason } => write!(f, "invalid layout options: {reason}"),
            Self::TooLarge { nodes, limit } => {
                write!(f, "layout of {nodes} nodes exceeds the limit of {limit}")
            }
            Self::Cyclic => write!(f, "layout ranks could not be assigned"),
            Self::Aborted { reason } => write!(f, "layout aborted: {reason}"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Errors from editing-session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Another operation is in flight for this workflow.
    Busy { state: EditorState },
    /// The graph rejected the operation.
    Rejected(GraphError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { state } => write!(f, "editor is busy ({state})"),
            Self::Rejected(err) => write!(f, "operation rejected: {err}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Busy { .. } => None,
            Self::Rejected(err) => Some(err),
        }
    }
}

impl From<GraphError> for EditorError {
    fn from(err: GraphError) -> Self {
        Self::Rejected(err)
    }
}
