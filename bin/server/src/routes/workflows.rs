//! Saved workflows.

use super::{load_workflow, parse_workflow_id};
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use mailflow_workflow::{DraftError, GraphTemplate, Workflow, WorkflowDraft, WorkflowSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct WorkflowList {
    pub workflows: Vec<WorkflowSummary>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowBody {
    pub workflow: Workflow,
}

/// Body of `POST /api/workflows`.
///
/// A `template` seeds the graph; it cannot be combined with explicit nodes
/// or edges.
#[derive(Debug, Deserialize)]
pub struct CreateWorkflow {
    #[serde(flatten)]
    pub draft: WorkflowDraft,
    #[serde(default)]
    pub template: Option<GraphTemplate>,
}

impl CreateWorkflow {
    fn into_workflow(self) -> Result<Workflow, ApiError> {
        let Some(template) = self.template else {
            return Ok(Workflow::from_draft(&self.draft)?);
        };
        if !self.draft.nodes.is_empty() || !self.draft.edges.is_empty() {
            return Err(ApiError::BadRequest {
                reason: "A template cannot be combined with nodes or edges".to_string(),
            });
        }

        let name = self.draft.checked_name()?;
        let graph = template.build().map_err(DraftError::from)?;
        let mut workflow = Workflow::with_graph(name, graph);
        workflow.metadata.description = self.draft.description;
        Ok(workflow)
    }
}

pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WorkflowList>, ApiError> {
    let workflows = state.store.list().await?;
    Ok(Json(WorkflowList { workflows }))
}

pub async fn create_workflow(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateWorkflow>,
) -> Result<(StatusCode, Json<WorkflowBody>), ApiError> {
    let workflow = body.into_workflow()?;
    state.store.create(&workflow).await?;

    info!(
        workflow_id = %workflow.id,
        nodes = workflow.graph.node_count(),
        "Workflow created"
    );
    Ok((StatusCode::CREATED, Json(WorkflowBody { workflow })))
}

pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowBody>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let workflow = load_workflow(&state, id).await?;
    Ok(Json(WorkflowBody { workflow }))
}

/// Saves a draft over an existing workflow.
///
/// An open editing session is reloaded with the saved graph.
pub async fn update_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<WorkflowDraft>,
) -> Result<Json<WorkflowBody>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let mut workflow = load_workflow(&state, id).await?;
    workflow.apply_draft(&draft)?;

    if !state.store.update(&workflow).await? {
        return Err(ApiError::WorkflowNotFound { id: id.to_string() });
    }

    if let Some(session) = state.sessions.get(id).await {
        session.lock().await.replace_graph(workflow.graph.clone());
    }

    info!(workflow_id = %id, nodes = workflow.graph.node_count(), "Workflow saved");
    Ok(Json(WorkflowBody { workflow }))
}

pub async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_workflow_id(&id)?;
    if !state.store.delete(id).await? {
        return Err(ApiError::WorkflowNotFound { id: id.to_string() });
    }
    state.sessions.discard(id).await;

    info!(workflow_id = %id, "Workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowBody>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let mut workflow = load_workflow(&state, id).await?;
    let active = workflow.toggle_active();

    if !state.store.update(&workflow).await? {
        return Err(ApiError::WorkflowNotFound { id: id.to_string() });
    }

    info!(workflow_id = %id, active, "Workflow toggled");
    Ok(Json(WorkflowBody { workflow }))
}

pub async fn duplicate_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WorkflowBody>), ApiError> {
    let id = parse_workflow_id(&id)?;
    let original = load_workflow(&state, id).await?;
    let workflow = original.duplicate();
    state.store.create(&workflow).await?;

    info!(workflow_id = %id, copy_id = %workflow.id, "Workflow duplicated");
    Ok((StatusCode::CREATED, Json(WorkflowBody { workflow })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(body: serde_json::Value) -> CreateWorkflow {
        serde_json::from_value(body).expect("deserialize")
    }

    #[test]
    fn template_seeds_the_graph() {
        let workflow = create(serde_json::json!({
            "name": "Onboarding",
            "template": "welcome_series"
        }))
        .into_workflow()
        .expect("workflow");

        assert_eq!(workflow.name(), "Onboarding");
        assert_eq!(workflow.graph.node_count(), 5);
        assert_eq!(workflow.graph.edge_count(), 4);
    }

    #[test]
    fn template_with_nodes_is_rejected() {
        let result = create(serde_json::json!({
            "name": "Onboarding",
            "template": "skeleton",
            "nodes": [{ "id": "t", "type": "trigger" }]
        }))
        .into_workflow();

        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
    }

    #[test]
    fn template_still_requires_a_name() {
        let result = create(serde_json::json!({ "name": " ", "template": "skeleton" }))
            .into_workflow();
        assert!(matches!(result, Err(ApiError::Draft(DraftError::BlankName))));
    }

    #[test]
    fn draft_without_template_is_taken_verbatim() {
        let workflow = create(serde_json::json!({
            "name": "Manual",
            "nodes": [
                { "id": "t", "type": "trigger", "position": { "x": 0, "y": 0 } },
                { "id": "e", "type": "end", "position": { "x": 0, "y": 100 } }
            ],
            "edges": [{ "id": "e1", "source": "t", "target": "e" }]
        }))
        .into_workflow()
        .expect("workflow");

        assert_eq!(workflow.graph.node_count(), 2);
        assert!(workflow.validate().is_ok());
    }
}
