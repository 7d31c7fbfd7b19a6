//! Edge types for workflow graphs.
//!
//! An edge is a directed connection from one node to another. The `type` tag
//! only selects how the canvas renders the edge; it carries no graph meaning.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of an edge within a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Wraps a caller-supplied identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier of the form `edge-<ulid>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("edge-{}", Ulid::new().to_string().to_lowercase()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Rendering tag for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Edge with an inline "insert node" control.
    #[default]
    Custom,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
}

impl Edge {
    /// Creates an edge with an explicit ID.
    #[must_use]
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Custom,
        }
    }

    /// Returns true if either endpoint is `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_ids_are_unique() {
        let a = EdgeId::generate();
        let b = EdgeId::generate();
        assert!(a.as_str().starts_with("edge-"));
        assert_ne!(a, b);
    }

    #[test]
    fn type_tag_is_optional_on_read() {
        let edge: Edge =
            serde_json::from_value(json!({ "id": "e1-2", "source": "1", "target": "2" }))
                .expect("decode");
        assert_eq!(edge.kind, EdgeKind::Custom);
        assert_eq!(edge.source, NodeId::from("1"));
    }

    #[test]
    fn encodes_custom_type_tag() {
        let edge = Edge::new("e", "a", "b");
        let value = serde_json::to_value(&edge).expect("encode");
        assert_eq!(
            value,
            json!({ "id": "e", "source": "a", "target": "b", "type": "custom" })
        );
    }

    #[test]
    fn touches_either_endpoint() {
        let edge = Edge::new("e", "a", "b");
        assert!(edge.touches(&NodeId::from("a")));
        assert!(edge.touches(&NodeId::from("b")));
        assert!(!edge.touches(&NodeId::from("c")));
    }
}
