//! Application state and router.

use crate::routes::{editor, health, templates, workflows};
use crate::sessions::SessionRegistry;
use crate::store::{MemoryTemplateStore, TemplateStore, WorkflowStore};
use axum::{
    Router,
    routing::{get, patch, post},
};
use mailflow_workflow::{LayeredLayout, LayoutEngine, LayoutOptions};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    /// Saved workflows.
    pub store: Arc<dyn WorkflowStore>,
    /// Email templates that email nodes send.
    pub templates: Arc<dyn TemplateStore>,
    /// Open editing sessions.
    pub sessions: SessionRegistry,
    /// Engine used for auto layout.
    pub engine: Arc<dyn LayoutEngine>,
    /// Layout settings for new editing sessions.
    pub layout: LayoutOptions,
}

impl AppState {
    /// Creates a new application state using the built-in layered layout and
    /// an empty in-memory template store.
    pub fn new(store: Arc<dyn WorkflowStore>, layout: LayoutOptions) -> Self {
        Self {
            store,
            templates: Arc::new(MemoryTemplateStore::new()),
            sessions: SessionRegistry::new(),
            engine: Arc::new(LayeredLayout),
            layout,
        }
    }

    /// Replaces the email template store.
    #[must_use]
    pub fn with_templates(mut self, templates: Arc<dyn TemplateStore>) -> Self {
        self.templates = templates;
        self
    }

    /// Replaces the layout engine.
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn LayoutEngine>) -> Self {
        self.engine = engine;
        self
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/workflows",
            get(workflows::list_workflows).post(workflows::create_workflow),
        )
        .route(
            "/api/workflows/{id}",
            get(workflows::get_workflow)
                .put(workflows::update_workflow)
                .delete(workflows::delete_workflow),
        )
        .route("/api/workflows/{id}/toggle", patch(workflows::toggle_workflow))
        .route(
            "/api/workflows/{id}/duplicate",
            post(workflows::duplicate_workflow),
        )
        .route(
            "/api/workflows/{id}/editor",
            post(editor::open_editor)
                .get(editor::snapshot)
                .delete(editor::discard_editor),
        )
        .route("/api/workflows/{id}/editor/nodes", post(editor::add_node))
        .route(
            "/api/workflows/{id}/editor/nodes/{node_id}",
            patch(editor::update_node).delete(editor::remove_node),
        )
        .route("/api/workflows/{id}/editor/edges", post(editor::connect))
        .route(
            "/api/workflows/{id}/editor/edges/{edge_id}",
            axum::routing::delete(editor::disconnect),
        )
        .route(
            "/api/workflows/{id}/editor/edges/{edge_id}/insert",
            post(editor::insert_on_edge),
        )
        .route("/api/workflows/{id}/editor/layout", post(editor::auto_layout))
        .route("/api/workflows/{id}/editor/save", post(editor::save))
        .route(
            "/api/email-templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/api/email-templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route(
            "/api/email-templates/{id}/duplicate",
            post(templates::duplicate_template),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
