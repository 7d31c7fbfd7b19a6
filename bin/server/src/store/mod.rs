//! Workflow and email template persistence.
//!
//! Workflows are stored whole: metadata, run statistics and the serialized
//! graph. Loading returns the graph exactly as it was saved.

mod memory;
mod postgres;
mod templates;

pub use memory::MemoryStore;
pub use postgres::PgWorkflowStore;
pub use templates::MemoryTemplateStore;

use async_trait::async_trait;
use mailflow_core::{Result, WorkflowId};
use mailflow_workflow::{EmailTemplate, TemplateId, Workflow, WorkflowSummary};
use std::fmt;

/// Errors from workflow storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A workflow with this ID already exists.
    AlreadyExists { id: WorkflowId },
    /// An email template with this ID already exists.
    TemplateExists { id: TemplateId },
    /// The backing database failed.
    Database { details: String },
    /// A stored row could not be turned back into a workflow.
    Decode { id: String, reason: String },
    /// A workflow could not be serialized for storage.
    Encode { id: WorkflowId, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists { id } => write!(f, "workflow already exists: {id}"),
            Self::TemplateExists { id } => write!(f, "email template already exists: {id}"),
            Self::Database { details } => write!(f, "workflow database error: {details}"),
            Self::Decode { id, reason } => {
                write!(f, "stored workflow '{id}' is unreadable: {reason}")
            }
            Self::Encode { id, reason } => {
                write!(f, "workflow '{id}' could not be encoded: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Storage for workflows.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Lists every workflow, most recently updated first.
    async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError>;

    /// Loads a workflow.
    async fn get(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError>;

    /// Stores a new workflow.
    async fn create(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Overwrites an existing workflow. Returns false if it does not exist.
    async fn update(&self, workflow: &Workflow) -> Result<bool, StoreError>;

    /// Deletes a workflow. Returns false if it did not exist.
    async fn delete(&self, id: WorkflowId) -> Result<bool, StoreError>;
}

/// Storage for email templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Lists templates in creation order, optionally only one category.
    async fn list(&self, category: Option<&str>) -> Result<Vec<EmailTemplate>, StoreError>;

    /// Loads a template.
    async fn get(&self, id: &TemplateId) -> Result<Option<EmailTemplate>, StoreError>;

    /// Stores a new template.
    async fn create(&self, template: &EmailTemplate) -> Result<(), StoreError>;

    /// Overwrites an existing template. Returns false if it does not exist.
    async fn update(&self, template: &EmailTemplate) -> Result<bool, StoreError>;

    /// Deletes a template. Returns false if it did not exist.
    async fn delete(&self, id: &TemplateId) -> Result<bool, StoreError>;
}
