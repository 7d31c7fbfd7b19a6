//! Open editing sessions, one per workflow.
//!
//! Each session sits behind its own async mutex so requests for the same
//! workflow take turns, while different workflows proceed independently.

use mailflow_core::WorkflowId;
use mailflow_workflow::{EditorSession, LayoutOptions, WorkflowGraph};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

pub type SharedSession = Arc<Mutex<EditorSession>>;

/// Registry of editing sessions keyed by workflow.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<WorkflowId, SharedSession>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the open session for `id`, if any.
    pub async fn get(&self, id: WorkflowId) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Returns the open session for `id`, or opens one on `graph`.
    ///
    /// The boolean is true when a new session was created.
    pub async fn open(
        &self,
        id: WorkflowId,
        graph: WorkflowGraph,
        options: &LayoutOptions,
    ) -> (SharedSession, bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&id) {
            return (existing.clone(), false);
        }
        let session = Arc::new(Mutex::new(EditorSession::with_options(
            graph,
            options.clone(),
        )));
        sessions.insert(id, session.clone());
        debug!(workflow_id = %id, "Editor session opened");
        (session, true)
    }

    /// Drops the session for `id`. Returns false if none was open.
    pub async fn discard(&self, id: WorkflowId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!(workflow_id = %id, "Editor session discarded");
        }
        removed
    }
}
