//! # workflow
//!
//! Workflow runs: a named sequence of provisioning actions, dispatched to a
//! backend under a change-set/edit-session visibility.
//!
//! - [`WorkflowRunner`] builds the request, enforces the deadline and turns
//!   backend error payloads into typed [`RunError`]s
//! - [`LocalBackend`] runs steps in-process through an `ActionExecutor`
//! - [`HttpBackend`] forwards to a remote `workflow/run` endpoint

pub mod backend;
pub mod error;
pub mod rpc;
pub mod runner;

pub use backend::{HttpBackend, LocalBackend, WorkflowBackend, WorkflowDefinition, WorkflowStep};
pub use error::{Result, RunError};
pub use rpc::{
    ApiError, ApiResponse, WorkflowRunRequest, WorkflowRunResponse, WorkflowRunnerState,
    WorkflowStatus,
};
pub use runner::WorkflowRunner;
