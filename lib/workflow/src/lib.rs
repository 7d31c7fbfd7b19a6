//! Workflow graphs for the mailflow email automation builder.
//!
//! This crate provides the model behind the workflow canvas:
//!
//! - **Graph Model**: Directed graphs using petgraph with typed nodes and edges
//! - **Node Types**: Trigger, Email, Delay, Condition, Action, End
//! - **Layout**: Layered (Sugiyama-style) automatic layout with safe fallback
//! - **Editor**: Serialised editing sessions with versioned layout results
//! - **Definitions**: Workflow metadata, save payloads and starter templates
//! - **Email templates**: The records email nodes send

pub mod definition;
pub mod edge;
pub mod editor;
pub mod email_template;
pub mod error;
pub mod graph;
pub mod layout;
pub mod node;
pub mod template;

#[cfg(test)]
mod graph_proptest;

pub use definition::{DraftError, RunStats, Workflow, WorkflowDraft, WorkflowMetadata, WorkflowSummary};
pub use edge::{Edge, EdgeId, EdgeKind};
pub use editor::{Applied, EditorSession, EditorState, LayoutOutcome, LayoutTicket, Notice, NoticeLevel};
pub use email_template::{
    EmailTemplate, TemplateDraft, TemplateError, TemplateId, TemplatePatch, TemplateStatus,
};
pub use error::{EditorError, GraphError, LayoutError};
pub use graph::{Duplicate, GraphDocument, IdMapping, Insertion, RemovedNode, WorkflowGraph};
pub use layout::{
    LayeredLayout, LayoutDirection, LayoutEngine, LayoutOptions, LayoutProblem, LayoutResult,
    NodePlacement,
};
pub use node::{Node, NodeConfig, NodeData, NodeDataError, NodeId, NodeKind, Position};
pub use template::GraphTemplate;
