//! mailflow HTTP server.
//!
//! Serves saved workflows and their live editing sessions as a JSON API.
//! Editing goes through [`mailflow_workflow::EditorSession`], one per open
//! workflow; saved workflows live in a [`store::WorkflowStore`].

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod sessions;
pub mod store;
