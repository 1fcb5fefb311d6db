//! Remote backend posting to a `workflow/run` endpoint

use super::WorkflowBackend;
use crate::error::{Result, RunError};
use crate::rpc::{ApiResponse, WorkflowRunRequest, WorkflowRunResponse};
use async_trait::async_trait;
use std::time::Duration;

/// Largest response body accepted
const MAX_BODY_SIZE: u64 = 4 * 1024 * 1024;

/// Backend that forwards runs to an HTTP API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoint: String,
    timeout: Duration,
}

impl HttpBackend {
    /// `base_url` is the API root; requests go to `<base_url>/workflow/run`
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/workflow/run", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, request: &WorkflowRunRequest) -> Result<String> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut response = agent
            .post(&self.endpoint)
            .header("User-Agent", "infragraph")
            .send_json(request)
            .map_err(|e| RunError::Transport(e.to_string()))?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_string()
            .map_err(|e| RunError::Transport(e.to_string()))
    }
}

/// Decode a response body, rejecting anything that is neither an error
/// payload nor a well-formed run response
pub fn decode_body(body: &str) -> Result<ApiResponse<WorkflowRunResponse>> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| RunError::InvalidState(format!("not JSON: {e}")))?;

    if value.get("error").is_some() {
        return serde_json::from_value(value).map_err(|e| RunError::InvalidState(e.to_string()));
    }
    serde_json::from_value::<WorkflowRunResponse>(value)
        .map(ApiResponse::Ok)
        .map_err(|e| RunError::InvalidState(e.to_string()))
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
    async fn dispatch(&self, request: WorkflowRunRequest) -> Result<ApiResponse<WorkflowRunResponse>> {
        let backend = self.clone();
        let body = tokio::task::spawn_blocking(move || backend.post(&request))
            .await
            .map_err(|e| RunError::Transport(e.to_string()))??;
        decode_body(&body)
    }
}
