//! HTTP handlers.
//!
//! - `health`: liveness check
//! - `workflows`: saved workflows (list, create, load, save, toggle, duplicate)
//! - `editor`: the live editing session of one workflow
//! - `templates`: email templates (list by category, create, load, update, delete, duplicate)

pub mod editor;
pub mod health;
pub mod templates;
pub mod workflows;

use crate::app::AppState;
use crate::error::ApiError;
use crate::sessions::SharedSession;
use mailflow_core::WorkflowId;
use mailflow_workflow::{EditorSession, Notice, Workflow};
use std::str::FromStr;

/// Parses the `{id}` path segment.
pub(crate) fn parse_workflow_id(raw: &str) -> Result<WorkflowId, ApiError> {
    WorkflowId::from_str(raw).map_err(|e| ApiError::InvalidId {
        id: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Loads a saved workflow or fails with 404.
pub(crate) async fn load_workflow(state: &AppState, id: WorkflowId) -> Result<Workflow, ApiError> {
    state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::WorkflowNotFound { id: id.to_string() })
}

/// Returns the open editing session or fails with 404.
pub(crate) async fn open_session(
    state: &AppState,
    id: WorkflowId,
) -> Result<SharedSession, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound { id: id.to_string() })
}

/// Response body for editor operations.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub notice: Notice,
    pub version: u64,
    pub state: mailflow_workflow::EditorState,
    pub graph: mailflow_workflow::WorkflowGraph,
    /// Structural problems that would block running the workflow.
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
}

impl EditorView {
    pub(crate) fn of(session: &EditorSession, notice: Notice) -> Self {
        Self {
            notice,
            version: session.version(),
            state: session.state(),
            graph: session.graph().clone(),
            issues: session
                .graph()
                .validation_issues()
                .iter()
                .map(ToString::to_string)
                .collect(),
            node_id: None,
            edge_id: None,
        }
    }

    pub(crate) fn with_node(mut self, node_id: impl ToString) -> Self {
        self.node_id = Some(node_id.to_string());
        self
    }

    pub(crate) fn with_edge(mut self, edge_id: impl ToString) -> Self {
        self.edge_id = Some(edge_id.to_string());
        self
    }
}
