//! Live editing sessions.
//!
//! Every handler locks the workflow's session for the duration of one
//! operation. Auto layout releases the lock while the engine runs so the
//! session can report its `layouting` state to other requests.

use super::{EditorView, load_workflow, open_session, parse_workflow_id};
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use mailflow_workflow::{
    EdgeId, EditorError, EditorState, GraphError, LayoutOptions, Node, NodeData, NodeId, NodeKind,
    Notice, Position,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info};

/// Body of `POST .../editor/nodes`.
///
/// Without `id` and `data` the node gets a generated ID and the default
/// configuration for its kind. `data` has the stored shape
/// `{ label, config, .. }`.
#[derive(Debug, Deserialize)]
pub struct AddNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

/// Body of `PATCH .../editor/nodes/{node_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateNode {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct Connect {
    pub source: NodeId,
    pub target: NodeId,
}

/// Body of `POST .../editor/edges/{edge_id}/insert`.
#[derive(Debug, Deserialize)]
pub struct InsertNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

fn decode_data(node_id: &NodeId, kind: NodeKind, data: JsonValue) -> Result<NodeData, GraphError> {
    NodeData::decode(kind, data).map_err(|e| GraphError::InvalidNodeData {
        node_id: node_id.clone(),
        reason: e.to_string(),
    })
}

/// Opens the editing session, or returns the one already open.
pub async fn open_editor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<EditorView>), ApiError> {
    let id = parse_workflow_id(&id)?;
    let workflow = load_workflow(&state, id).await?;
    let (session, created) = state.sessions.open(id, workflow.graph, &state.layout).await;

    let session = session.lock().await;
    if created {
        info!(workflow_id = %id, nodes = session.graph().node_count(), "Editor opened");
        let view = EditorView::of(&session, Notice::success("Workflow opened"));
        Ok((StatusCode::CREATED, Json(view)))
    } else {
        let view = EditorView::of(&session, Notice::success("Resumed editing"));
        Ok((StatusCode::OK, Json(view)))
    }
}

pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EditorView>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let session = open_session(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(EditorView::of(&session, Notice::success("Workflow loaded"))))
}

/// Closes the session without saving.
pub async fn discard_editor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_workflow_id(&id)?;
    if !state.sessions.discard(id).await {
        return Err(ApiError::SessionNotFound { id: id.to_string() });
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AddNode>,
) -> Result<(StatusCode, Json<EditorView>), ApiError> {
    let id = parse_workflow_id(&id)?;
    let session = open_session(&state, id).await?;
    let mut session = session.lock().await;

    let applied = if body.id.is_none() && body.data.is_none() {
        session.add_node(body.kind, body.label, body.position)?
    } else {
        let node_id = body.id.unwrap_or_else(|| NodeId::generate(body.kind));
        let mut data = decode_data(&node_id, body.kind, body.data.unwrap_or(JsonValue::Null))?;
        if let Some(label) = body.label {
            data.label = Some(label);
        }
        let position = body
            .position
            .unwrap_or_else(|| session.next_palette_position());
        session.add_configured_node(Node::from_data(node_id, data, position))?
    };

    let view = EditorView::of(&session, applied.notice).with_node(&applied.value);
    Ok((StatusCode::CREATED, Json(view)))
}

/// Moves, relabels or reconfigures a node.
pub async fn update_node(
    State(state): State<Arc<AppState>>,
    Path((id, node_id)): Path<(String, String)>,
    Json(body): Json<UpdateNode>,
) -> Result<Json<EditorView>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let node_id = NodeId::from(node_id);
    if body.label.is_none() && body.position.is_none() && body.data.is_none() {
        return Err(ApiError::BadRequest {
            reason: "Nothing to change".to_string(),
        });
    }

    let session = open_session(&state, id).await?;
    let mut session = session.lock().await;

    let kind = session
        .graph()
        .get_node(&node_id)
        .map(Node::kind)
        .ok_or_else(|| GraphError::NodeNotFound {
            node_id: node_id.clone(),
        })?;
    let data = body
        .data
        .map(|data| decode_data(&node_id, kind, data))
        .transpose()?;

    let mut notice = None;
    if body.label.is_some() || data.is_some() {
        notice = Some(session.update_node(&node_id, body.label, data)?.notice);
    }
    if let Some(position) = body.position {
        notice = Some(session.move_node(&node_id, position)?.notice);
    }

    let notice = notice.unwrap_or_else(|| Notice::success("Node updated"));
    Ok(Json(EditorView::of(&session, notice).with_node(&node_id)))
}

/// Deletes a node together with its connections.
pub async fn remove_node(
    State(state): State<Arc<AppState>>,
    Path((id, node_id)): Path<(String, String)>,
) -> Result<Json<EditorView>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let node_id = NodeId::from(node_id);
    let session = open_session(&state, id).await?;
    let mut session = session.lock().await;

    let applied = session.remove_node(&node_id)?;
    Ok(Json(EditorView::of(&session, applied.notice).with_node(&node_id)))
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Connect>,
) -> Result<(StatusCode, Json<EditorView>), ApiError> {
    let id = parse_workflow_id(&id)?;
    let session = open_session(&state, id).await?;
    let mut session = session.lock().await;

    let applied = session.connect(&body.source, &body.target)?;
    let view = EditorView::of(&session, applied.notice).with_edge(&applied.value);
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    Path((id, edge_id)): Path<(String, String)>,
) -> Result<Json<EditorView>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let session = open_session(&state, id).await?;
    let mut session = session.lock().await;

    let applied = session.disconnect(&EdgeId::from(edge_id))?;
    Ok(Json(EditorView::of(&session, applied.notice).with_edge(&applied.value.id)))
}

/// Splits an edge with a new node.
pub async fn insert_on_edge(
    State(state): State<Arc<AppState>>,
    Path((id, edge_id)): Path<(String, String)>,
    Json(body): Json<InsertNode>,
) -> Result<(StatusCode, Json<EditorView>), ApiError> {
    let id = parse_workflow_id(&id)?;
    let session = open_session(&state, id).await?;
    let mut session = session.lock().await;

    let edge_id = EdgeId::from(edge_id);
    let applied = session.insert_on_edge(&edge_id, body.kind, body.label, body.position)?;
    let view = EditorView::of(&session, applied.notice).with_node(&applied.value.node_id);
    Ok((StatusCode::CREATED, Json(view)))
}

/// Runs auto layout.
///
/// A non-empty body is a set of layout options that replaces the session's
/// settings. An engine failure leaves positions unchanged and is reported as
/// a warning notice, not an error.
pub async fn auto_layout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<EditorView>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let options = if body.is_empty() {
        None
    } else {
        let options: LayoutOptions =
            serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest {
                reason: format!("Invalid layout options: {e}"),
            })?;
        Some(options)
    };

    let session = open_session(&state, id).await?;
    let ticket = {
        let mut session = session.lock().await;
        if let Some(options) = options {
            if session.state() != EditorState::Idle {
                return Err(EditorError::Busy {
                    state: session.state(),
                }
                .into());
            }
            session.set_options(options);
        }
        session.begin_layout()?
    };
    debug!(workflow_id = %id, version = ticket.version(), "Layout requested");

    // Finishing inside the task keeps the session consistent even if this
    // request is dropped while the engine runs.
    let engine = state.engine.clone();
    let task = tokio::spawn(async move {
        let result = ticket.compute(engine).await;
        let mut session = session.lock().await;
        let outcome = session.finish_layout(ticket, result);
        EditorView::of(&session, outcome.notice())
    });

    let view = task.await.map_err(|e| ApiError::Internal {
        reason: format!("layout task failed: {e}"),
    })?;
    info!(workflow_id = %id, version = view.version, "Layout finished");
    Ok(Json(view))
}

/// Writes the session graph back to the workflow store.
///
/// On failure the session keeps the graph so the save can be retried.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EditorView>, ApiError> {
    let id = parse_workflow_id(&id)?;
    let session = open_session(&state, id).await?;
    let graph = session.lock().await.graph().clone();

    let mut workflow = load_workflow(&state, id).await?;
    workflow.graph = graph;
    workflow.touch();
    if !state.store.update(&workflow).await? {
        return Err(ApiError::WorkflowNotFound { id: id.to_string() });
    }
    info!(workflow_id = %id, nodes = workflow.graph.node_count(), "Workflow saved from editor");

    let session = session.lock().await;
    Ok(Json(EditorView::of(&session, Notice::success("Workflow saved"))))
}
