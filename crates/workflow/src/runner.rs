//! Workflow runner - dispatch with a deadline and typed failures

use crate::backend::WorkflowBackend;
use crate::error::{Result, RunError};
use crate::rpc::{ApiResponse, WorkflowRunRequest, WorkflowRunResponse};
use entitystore::Visibility;
use std::sync::Arc;
use std::time::Duration;

/// Default dispatch deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs workflows on a backend in the caller's visibility
#[derive(Clone)]
pub struct WorkflowRunner {
    backend: Arc<dyn WorkflowBackend>,
    timeout: Duration,
}

impl WorkflowRunner {
    pub fn new(backend: Arc<dyn WorkflowBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Run `workflow_id` and wait for its response
    ///
    /// Backend error payloads become [`RunError::RequestFailed`]; nothing
    /// is applied on the caller's side in that case.
    pub async fn run(&self, workflow_id: i64, visibility: Visibility) -> Result<WorkflowRunResponse> {
        let request = WorkflowRunRequest::new(workflow_id, visibility);
        log::debug!("dispatching workflow {workflow_id} in {visibility}");

        let response = tokio::time::timeout(self.timeout, self.backend.dispatch(request))
            .await
            .map_err(|_| RunError::Timeout(self.timeout))??;

        match response {
            ApiResponse::Error { error } => {
                log::warn!("workflow {workflow_id} rejected: {}", error.message);
                Err(RunError::RequestFailed {
                    code: error.code,
                    message: error.message,
                })
            }
            ApiResponse::Ok(response) => {
                let state = &response.workflow_runner_state;
                if state.updated_at < state.created_at {
                    return Err(RunError::InvalidState(format!(
                        "state {} updated before it was created",
                        state.pk
                    )));
                }
                Ok(response)
            }
        }
    }
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
