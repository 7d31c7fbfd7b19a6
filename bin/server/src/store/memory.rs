use super::{StoreError, WorkflowStore};
use async_trait::async_trait;
use mailflow_core::{Result, WorkflowId};
use mailflow_workflow::{Workflow, WorkflowSummary};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;

/// Workflow store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError> {
        let workflows = self.workflows.read().await;
        let mut summaries: Vec<WorkflowSummary> =
            workflows.values().map(WorkflowSummary::from).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn get(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(&id).cloned())
    }

    #[instrument(skip_all, fields(workflow_id = %workflow.id))]
    async fn create(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(&workflow.id) {
            return Err(StoreError::AlreadyExists { id: workflow.id }.into());
        }
        workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    #[instrument(skip_all, fields(workflow_id = %workflow.id))]
    async fn update(&self, workflow: &Workflow) -> Result<bool, StoreError> {
        let mut workflows = self.workflows.write().await;
        match workflows.get_mut(&workflow.id) {
            Some(existing) => {
                *existing = workflow.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: WorkflowId) -> Result<bool, StoreError> {
        Ok(self.workflows.write().await.remove(&id).is_some())
    }
}
