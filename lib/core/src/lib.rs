//! Core domain types and utilities for mailflow.
//!
//! This crate provides the identifiers and error plumbing shared by the
//! workflow model and the server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, WorkflowId};
