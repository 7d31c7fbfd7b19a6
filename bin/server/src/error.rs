//! API error type.
//!
//! Every error becomes a JSON body `{ error, notice }` where `notice` is the
//! message the canvas shows the user. Internal details are logged, not sent.

use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailflow_workflow::{DraftError, EditorError, GraphError, Notice, TemplateError};
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;

/// Errors returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The workflow ID in the path is malformed.
    InvalidId { id: String, reason: String },
    /// No workflow with this ID.
    WorkflowNotFound { id: String },
    /// No editing session is open for this workflow.
    SessionNotFound { id: String },
    /// No email template with this ID.
    TemplateNotFound { id: String },
    /// The request body is unusable.
    BadRequest { reason: String },
    /// A save payload was rejected.
    Draft(DraftError),
    /// An email template payload was rejected.
    Template(TemplateError),
    /// An editing operation was rejected.
    Editor(EditorError),
    /// The workflow store failed.
    Storage(Report<StoreError>),
    /// A background task did not complete.
    Internal { reason: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId { id, reason } => write!(f, "invalid workflow id '{id}': {reason}"),
            Self::WorkflowNotFound { id } => write!(f, "workflow '{id}' not found"),
            Self::SessionNotFound { id } => {
                write!(f, "no editor session open for workflow '{id}'")
            }
            Self::TemplateNotFound { id } => write!(f, "email template '{id}' not found"),
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
            Self::Draft(err) => write!(f, "{err}"),
            Self::Template(err) => write!(f, "{err}"),
            Self::Editor(err) => write!(f, "{err}"),
            Self::Storage(report) => write!(f, "storage failure: {report}"),
            Self::Internal { reason } => write!(f, "internal error: {reason}"),
        }
    }
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        Self::Draft(err)
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        Self::Template(err)
    }
}

impl From<EditorError> for ApiError {
    fn from(err: EditorError) -> Self {
        Self::Editor(err)
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        Self::Editor(EditorError::Rejected(err))
    }
}

impl From<Report<StoreError>> for ApiError {
    fn from(report: Report<StoreError>) -> Self {
        Self::Storage(report)
    }
}

fn graph_status(err: &GraphError) -> StatusCode {
    match err {
        GraphError::NodeNotFound { .. } | GraphError::EdgeNotFound { .. } => StatusCode::NOT_FOUND,
        GraphError::DuplicateNode { .. } | GraphError::DuplicateEdge { .. } => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId { .. } | Self::BadRequest { .. } | Self::Template(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::WorkflowNotFound { .. }
            | Self::SessionNotFound { .. }
            | Self::TemplateNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Draft(DraftError::BlankName) => StatusCode::BAD_REQUEST,
            Self::Draft(DraftError::Graph(err)) => graph_status(err),
            Self::Editor(EditorError::Busy { .. }) => StatusCode::CONFLICT,
            Self::Editor(EditorError::Rejected(err)) => graph_status(err),
            Self::Storage(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn notice(&self) -> Notice {
        match self {
            Self::InvalidId { .. } => Notice::error("Invalid workflow ID"),
            Self::WorkflowNotFound { .. } => Notice::error("Workflow not found"),
            Self::SessionNotFound { .. } => Notice::error("Open the workflow in the editor first"),
            Self::TemplateNotFound { .. } => Notice::error("Template not found"),
            Self::Template(err) => Notice::error(err.to_string()),
            Self::BadRequest { reason } => Notice::error(reason.clone()),
            Self::Draft(DraftError::BlankName) => Notice::error("Please enter a workflow name"),
            Self::Draft(err) => Notice::error(err.to_string()),
            Self::Editor(err) => err.notice(),
            Self::Storage(_) => {
                Notice::error("Failed to save workflow, your changes are kept so you can retry")
            }
            Self::Internal { .. } => Notice::error("Something went wrong, please try again"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    notice: Notice,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            Self::Storage(report) => {
                tracing::error!(error = %report, "Workflow storage failed");
                "internal server error".to_string()
            }
            Self::Internal { reason } => {
                tracing::error!(error = %reason, "Request failed");
                "internal server error".to_string()
            }
            other => {
                tracing::debug!(error = %other, status = %status, "Request rejected");
                other.to_string()
            }
        };

        let body = ErrorBody {
            error,
            notice: self.notice(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailflow_workflow::{EditorState, NodeId, NoticeLevel};

    #[test]
    fn busy_maps_to_conflict() {
        let err = ApiError::from(EditorError::Busy {
            state: EditorState::Layouting,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.notice().level, NoticeLevel::Warning);
    }

    #[test]
    fn missing_node_maps_to_not_found() {
        let err = ApiError::from(GraphError::NodeNotFound {
            node_id: NodeId::from("n"),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn dangling_edge_is_unprocessable() {
        let err = ApiError::from(GraphError::DanglingEdge {
            edge_id: "e".into(),
            node_id: "n".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn blank_name_is_bad_request() {
        let err = ApiError::from(DraftError::BlankName);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn template_errors_map_to_client_statuses() {
        let missing = ApiError::TemplateNotFound { id: "9".to_string() };
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(TemplateError::MissingNameOrSubject);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.notice().message, "Template name and subject are required");
    }

    #[test]
    fn storage_failure_is_internal() {
        let report: Report<StoreError> = StoreError::Database {
            details: "connection reset".to_string(),
        }
        .into();
        let err = ApiError::from(report);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.notice().message.contains("retry"));
    }
}
