//! Request and response shapes of the `workflow/run` call

use chrono::{DateTime, Utc};
use entitystore::Visibility;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ask a backend to run workflow `id` in the caller's visibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunRequest {
    pub id: i64,
    #[serde(flatten)]
    pub visibility: Visibility,
}

impl WorkflowRunRequest {
    pub fn new(id: i64, visibility: Visibility) -> Self {
        Self { id, visibility }
    }
}

/// Status of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Success,
    Failure,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// One recorded transition of a workflow run
///
/// `id` names the run's state across transitions; every transition gets a
/// fresh `pk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunnerState {
    pub id: i64,
    pub pk: i64,
    pub workflow_runner_id: i64,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Captured logs and final state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunResponse {
    pub logs: Vec<String>,
    #[serde(alias = "workflowRunnerState")]
    pub workflow_runner_state: WorkflowRunnerState,
}

/// Error payload of a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Either the call's result or `{"error": {code, message}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Error { error: ApiError },
    Ok(T),
}

impl<T> ApiResponse<T> {
    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self::Error {
            error: ApiError {
                code,
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitystore::ChangeSetPk;
    use serde_json::json;

    #[test]
    fn test_request_merges_visibility() {
        let request = WorkflowRunRequest::new(7, Visibility::change_set(ChangeSetPk(3)));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": 7, "change_set_id": 3})
        );

        let head = WorkflowRunRequest::new(7, Visibility::head());
        assert_eq!(serde_json::to_value(&head).unwrap(), json!({"id": 7}));
    }

    #[test]
    fn test_error_payload_decodes() {
        let body = json!({"error": {"code": 42, "message": "workflow not found"}});
        let response: ApiResponse<WorkflowRunResponse> = serde_json::from_value(body).unwrap();
        assert_eq!(response, ApiResponse::error(42, "workflow not found"));
    }

    #[test]
    fn test_response_accepts_camel_case_state_key() {
        let body = json!({
            "logs": ["ok"],
            "workflowRunnerState": {
                "id": 1, "pk": 2, "workflow_runner_id": 3, "status": "success",
                "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:01Z"
            }
        });
        let response: ApiResponse<WorkflowRunResponse> = serde_json::from_value(body).unwrap();
        match response {
            ApiResponse::Ok(r) => assert_eq!(r.workflow_runner_state.status, WorkflowStatus::Success),
            ApiResponse::Error { error } => panic!("unexpected error: {}", error.message),
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let state = json!({
            "id": 1, "pk": 2, "workflow_runner_id": 3, "status": "queued",
            "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<WorkflowRunnerState>(state).is_err());
    }
}
