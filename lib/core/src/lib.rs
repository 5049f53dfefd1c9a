//! Core identifiers and error handling shared by the taskweave crates.
//!
//! The workflow engine builds on the `Result` alias and the
//! ULID-backed identifiers defined here.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, ParseIdError, WorkflowId, WorkflowRunId};
