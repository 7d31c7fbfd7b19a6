//! Workflow definition types.
//!
//! A workflow is a named email automation that consists of:
//! - Metadata (name, description, active flag, timestamps)
//! - Run statistics assigned by the server
//! - A directed graph of nodes
//!
//! On the wire the metadata and the graph's `nodes`/`edges` sit at the top
//! level next to `id`, matching the save payload.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::node::Node;
use chrono::{DateTime, Utc};
use mailflow_core::WorkflowId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata for a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    /// Human-readable name for this workflow.
    pub name: String,
    /// Description of what this workflow does.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether this workflow is live.
    #[serde(default)]
    pub is_active: bool,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowMetadata {
    /// Creates new, inactive metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Run statistics. Carried through unchanged; nothing here interprets them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunStats {
    pub total_runs: u64,
    /// Percentage of successful runs, 0 to 100.
    pub success_rate: f64,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Errors in a save payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// The workflow name is empty or whitespace.
    BlankName,
    /// The nodes and edges do not form a consistent graph.
    Graph(GraphError),
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankName => write!(f, "workflow name is required"),
            Self::Graph(err) => write!(f, "invalid workflow graph: {err}"),
        }
    }
}

impl std::error::Error for DraftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BlankName => None,
            Self::Graph(err) => Some(err),
        }
    }
}

impl From<GraphError> for DraftError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

/// The save payload: `{ name, description, nodes, edges }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowDraft {
    /// Returns the trimmed name, rejecting blank names.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::BlankName`] if the name is empty.
    pub fn checked_name(&self) -> Result<&str, DraftError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DraftError::BlankName);
        }
        Ok(name)
    }

    /// Builds the graph described by the draft.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate IDs or dangling edges.
    pub fn to_graph(&self) -> Result<WorkflowGraph, GraphError> {
        WorkflowGraph::from_parts(self.nodes.clone(), self.edges.clone())
    }
}

/// A complete workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Workflow metadata.
    #[serde(flatten)]
    pub metadata: WorkflowMetadata,
    #[serde(default)]
    pub stats: RunStats,
    /// The workflow graph (nodes and edges).
    #[serde(flatten)]
    pub graph: WorkflowGraph,
}

impl Workflow {
    /// Creates a new empty workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_graph(name, WorkflowGraph::new())
    }

    /// Creates a new workflow around an existing graph.
    #[must_use]
    pub fn with_graph(name: impl Into<String>, graph: WorkflowGraph) -> Self {
        Self {
            id: WorkflowId::new(),
            metadata: WorkflowMetadata::new(name),
            stats: RunStats::default(),
            graph,
        }
    }

    /// Creates a workflow from a save payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the graph is inconsistent.
    pub fn from_draft(draft: &WorkflowDraft) -> Result<Self, DraftError> {
        let name = draft.checked_name()?;
        let mut workflow = Self::with_graph(name, draft.to_graph()?);
        workflow.metadata.description = draft.description.clone();
        Ok(workflow)
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns whether the workflow is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.metadata.is_active
    }

    /// Flips the active flag and returns the new value.
    pub fn toggle_active(&mut self) -> bool {
        self.metadata.is_active = !self.metadata.is_active;
        self.touch();
        self.metadata.is_active
    }

    /// Replaces name, description and graph with the draft's.
    ///
    /// Nothing changes if the draft is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the graph is inconsistent.
    pub fn apply_draft(&mut self, draft: &WorkflowDraft) -> Result<(), DraftError> {
        let name = draft.checked_name()?.to_string();
        let graph = draft.to_graph()?;

        self.metadata.name = name;
        self.metadata.description = draft.description.clone();
        self.graph = graph;
        self.touch();
        Ok(())
    }

    /// Copies the workflow under a new ID.
    ///
    /// The copy is named `"<name> (Copy)"`, starts inactive with no runs, and
    /// gets a graph with fresh node and edge IDs.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut metadata = WorkflowMetadata::new(format!("{} (Copy)", self.metadata.name));
        metadata.description = self.metadata.description.clone();
        Self {
            id: WorkflowId::new(),
            metadata,
            stats: RunStats::default(),
            graph: self.graph.duplicate().graph,
        }
    }

    /// Validates the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow graph is invalid.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.graph.validate()
    }

    /// Marks the workflow as updated (bumps updated_at timestamp).
    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }
}

/// Summary information about a workflow (for listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Number of nodes in the graph.
    pub node_count: usize,
    pub stats: RunStats,
    pub updated_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id,
            name: workflow.metadata.name.clone(),
            description: workflow.metadata.description.clone(),
            is_active: workflow.metadata.is_active,
            node_count: workflow.graph.node_count(),
            stats: workflow.stats.clone(),
            updated_at: workflow.metadata.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::GraphTemplate;
    use std::collections::HashSet;

    fn draft(name: &str) -> WorkflowDraft {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "description": "Onboarding",
            "nodes": [
                { "id": "t", "type": "trigger", "position": { "x": 0, "y": 0 }, "data": { "label": "Signup" } },
                { "id": "e", "type": "end", "position": { "x": 0, "y": 100 }, "data": {} }
            ],
            "edges": [{ "id": "t-e", "source": "t", "target": "e", "type": "custom" }]
        }))
        .expect("decode draft")
    }

    #[test]
    fn workflow_creation() {
        let workflow = Workflow::new("Test Workflow");
        assert_eq!(workflow.name(), "Test Workflow");
        assert!(!workflow.is_active());
        assert_eq!(workflow.graph.node_count(), 0);
    }

    #[test]
    fn toggle_flips_active_flag() {
        let mut workflow = Workflow::new("Test");

        assert!(workflow.toggle_active());
        assert!(!workflow.toggle_active());
    }

    #[test]
    fn from_draft_builds_graph() {
        let workflow = Workflow::from_draft(&draft("  Welcome  ")).expect("valid");

        assert_eq!(workflow.name(), "Welcome");
        assert_eq!(workflow.metadata.description.as_deref(), Some("Onboarding"));
        assert_eq!(workflow.graph.node_count(), 2);
        assert_eq!(workflow.graph.edge_count(), 1);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            Workflow::from_draft(&draft("   ")),
            Err(DraftError::BlankName)
        );
    }

    #[test]
    fn rejected_draft_leaves_workflow_unchanged() {
        let mut workflow = Workflow::from_draft(&draft("Welcome")).expect("valid");
        let before = workflow.clone();
        let mut bad = draft("Renamed");
        bad.edges.push(Edge::new("x", "t", "missing"));

        let result = workflow.apply_draft(&bad);

        assert!(matches!(result, Err(DraftError::Graph(_))));
        assert_eq!(workflow, before);
    }

    #[test]
    fn duplicate_is_inactive_copy_with_fresh_ids() {
        let mut workflow = Workflow::with_graph(
            "Welcome Email Series",
            GraphTemplate::WelcomeSeries.build().expect("template"),
        );
        workflow.toggle_active();
        workflow.stats.total_runs = 42;

        let copy = workflow.duplicate();

        assert_ne!(copy.id, workflow.id);
        assert_eq!(copy.name(), "Welcome Email Series (Copy)");
        assert!(!copy.is_active());
        assert_eq!(copy.stats, RunStats::default());
        assert_eq!(copy.graph.node_count(), workflow.graph.node_count());
        let original: HashSet<_> = workflow.graph.nodes().map(|n| n.id.clone()).collect();
        assert!(copy.graph.nodes().all(|n| !original.contains(&n.id)));
    }

    #[test]
    fn summary_counts_nodes() {
        let workflow = Workflow::from_draft(&draft("Summary")).expect("valid");
        let summary = WorkflowSummary::from(&workflow);

        assert_eq!(summary.id, workflow.id);
        assert_eq!(summary.node_count, 2);
    }

    #[test]
    fn wire_form_is_flat_camel_case() {
        let workflow = Workflow::from_draft(&draft("Wire")).expect("valid");

        let value = serde_json::to_value(&workflow).expect("serialize");

        assert_eq!(value["name"], "Wire");
        assert_eq!(value["isActive"], false);
        assert!(value["createdAt"].is_string());
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["edges"][0]["source"], "t");
        assert_eq!(value["stats"]["totalRuns"], 0);
    }

    #[test]
    fn workflow_serde_roundtrip() {
        let workflow = Workflow::from_draft(&draft("Serialization Test")).expect("valid");
        let json = serde_json::to_string(&workflow).expect("serialize");
        let parsed: Workflow = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed, workflow);
    }
}
