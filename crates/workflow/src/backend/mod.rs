//! Execution backends for workflow runs
//!
//! A backend receives a [`WorkflowRunRequest`] and answers with the run's
//! logs and state, or with an error payload. [`LocalBackend`] executes
//! actions in-process; [`HttpBackend`] forwards to a remote `workflow/run`
//! endpoint.

pub mod http;
pub mod local;

use crate::error::Result;
use crate::rpc::{ApiResponse, WorkflowRunRequest, WorkflowRunResponse};
use async_trait::async_trait;

/// Something that can execute a workflow run request
///
/// `Err` is reserved for transport problems; errors the backend itself
/// reports come back as [`ApiResponse::Error`].
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    async fn dispatch(&self, request: WorkflowRunRequest) -> Result<ApiResponse<WorkflowRunResponse>>;
}

pub use http::HttpBackend;
pub use local::{LocalBackend, WorkflowDefinition, WorkflowStep};
