//! In-process backend that runs action steps through an [`ActionExecutor`]

use super::WorkflowBackend;
use crate::error::Result;
use crate::rpc::{
    ApiResponse, WorkflowRunRequest, WorkflowRunResponse, WorkflowRunnerState, WorkflowStatus,
};
use actionkit::{Action, ActionExecutor, Component};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// Error code for an unknown workflow id
pub const NOT_FOUND: i64 = 404;

/// One action against one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Component id
    pub component: String,
    pub action: Action,
}

/// A named, ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

type SharedComponent = Arc<AsyncMutex<Component>>;

/// Runs registered workflows step by step
///
/// Steps run in order, each on the blocking pool since providers spawn
/// processes. Actions on the same component are serialized through a
/// per-component lock, so concurrent runs cannot both create it. The first
/// failing step ends the run with `failure`.
pub struct LocalBackend {
    definitions: BTreeMap<i64, WorkflowDefinition>,
    executor: Arc<ActionExecutor>,
    components: BTreeMap<String, SharedComponent>,
    history: Mutex<Vec<WorkflowRunnerState>>,
    next_pk: AtomicI64,
    next_runner_id: AtomicI64,
}

impl LocalBackend {
    pub fn new(executor: ActionExecutor) -> Self {
        Self {
            definitions: BTreeMap::new(),
            executor: Arc::new(executor),
            components: BTreeMap::new(),
            history: Mutex::new(Vec::new()),
            next_pk: AtomicI64::new(1),
            next_runner_id: AtomicI64::new(1),
        }
    }

    pub fn with_definitions(mut self, definitions: impl IntoIterator<Item = WorkflowDefinition>) -> Self {
        for definition in definitions {
            self.definitions.insert(definition.id, definition);
        }
        self
    }

    pub fn with_components(mut self, components: impl IntoIterator<Item = Component>) -> Self {
        for component in components {
            self.components
                .insert(component.id.clone(), Arc::new(AsyncMutex::new(component)));
        }
        self
    }

    /// Continue pk and runner numbering after previously persisted runs
    pub fn with_history(self, history: Vec<WorkflowRunnerState>) -> Self {
        let max_pk = history.iter().map(|s| s.pk).max().unwrap_or(0);
        let max_runner = history.iter().map(|s| s.workflow_runner_id).max().unwrap_or(0);
        self.next_pk.store(max_pk + 1, Ordering::SeqCst);
        self.next_runner_id.store(max_runner + 1, Ordering::SeqCst);
        *self.history.lock().unwrap_or_else(PoisonError::into_inner) = history;
        self
    }

    /// Every recorded transition, oldest first
    pub fn history(&self) -> Vec<WorkflowRunnerState> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current state of every component
    pub async fn components(&self) -> Vec<Component> {
        let mut out = Vec::with_capacity(self.components.len());
        for component in self.components.values() {
            out.push(component.lock().await.clone());
        }
        out
    }

    fn record(&self, state: &WorkflowRunnerState) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state.clone());
    }

    /// Advance a state to `status` under a fresh pk and record it
    fn transition(&self, state: &WorkflowRunnerState, status: WorkflowStatus) -> WorkflowRunnerState {
        let next = WorkflowRunnerState {
            pk: self.next_pk.fetch_add(1, Ordering::SeqCst),
            status,
            updated_at: Utc::now(),
            ..state.clone()
        };
        self.record(&next);
        next
    }

    async fn run_step(&self, step: &WorkflowStep) -> std::result::Result<String, String> {
        let component = self
            .components
            .get(&step.component)
            .ok_or_else(|| format!("unknown component {}", step.component))?;

        let guard = Arc::clone(component).lock_owned().await;
        let executor = Arc::clone(&self.executor);
        let action = step.action;

        tokio::task::spawn_blocking(move || {
            let mut component = guard;
            executor
                .apply(&mut component, action)
                .map(|_| format!("{action} {}: ok", component.name))
                .map_err(|e| format!("{action} {}: {e} ({})", component.name, e.advice()))
        })
        .await
        .map_err(|e| format!("step panicked: {e}"))?
    }
}

/// A run between its `running` record and its terminal one
///
/// Dropped unfinished, as when the caller's deadline cancels dispatch, it
/// records `failure` so history never keeps a dangling `running` state.
struct PendingRun<'a> {
    backend: &'a LocalBackend,
    started: WorkflowRunnerState,
    finished: bool,
}

impl PendingRun<'_> {
    fn finish(mut self, status: WorkflowStatus) -> WorkflowRunnerState {
        self.finished = true;
        self.backend.transition(&self.started, status)
    }
}

impl Drop for PendingRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!(
                "workflow run {} cancelled before finishing",
                self.started.workflow_runner_id
            );
            self.backend.transition(&self.started, WorkflowStatus::Failure);
        }
    }
}

#[async_trait]
impl WorkflowBackend for LocalBackend {
    async fn dispatch(&self, request: WorkflowRunRequest) -> Result<ApiResponse<WorkflowRunResponse>> {
        let Some(definition) = self.definitions.get(&request.id) else {
            return Ok(ApiResponse::error(
                NOT_FOUND,
                format!("workflow {} not found", request.id),
            ));
        };

        let now = Utc::now();
        let runner_id = self.next_runner_id.fetch_add(1, Ordering::SeqCst);
        let pk = self.next_pk.fetch_add(1, Ordering::SeqCst);
        let started = WorkflowRunnerState {
            id: runner_id,
            pk,
            workflow_runner_id: runner_id,
            status: WorkflowStatus::Running,
            created_at: now,
            updated_at: now,
        };
        self.record(&started);
        let run = PendingRun {
            backend: self,
            started,
            finished: false,
        };

        let mut logs = vec![format!(
            "running workflow {} ({}) in {}",
            definition.name, definition.id, request.visibility
        )];
        let mut status = WorkflowStatus::Success;

        for (index, step) in definition.steps.iter().enumerate() {
            match self.run_step(step).await {
                Ok(line) => logs.push(line),
                Err(line) => {
                    log::warn!("workflow {} step {}: {}", definition.name, index + 1, line);
                    logs.push(line);
                    status = WorkflowStatus::Failure;
                    break;
                }
            }
        }

        let finished = run.finish(status);
        log::info!("workflow {} finished: {}", definition.name, status);
        logs.push(format!("workflow {status}"));

        Ok(ApiResponse::Ok(WorkflowRunResponse {
            logs,
            workflow_runner_state: finished,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actionkit::{Invocation, Provider, ProviderOutput, Resource};
    use entitystore::Visibility;
    use serde_json::json;
    use crate::error::RunError;
    use crate::runner::WorkflowRunner;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Provider for CountingProvider {
        fn execute(&self, _invocation: &Invocation) -> actionkit::Result<ProviderOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(ProviderOutput {
                exit_code: 0,
                stdout: r#"{"Instances":[{"InstanceId":"i-1"}]}"#.into(),
                stderr: String::new(),
            })
        }
    }

    fn component(id: &str) -> Component {
        Component {
            id: id.into(),
            name: id.into(),
            kind: "awsEc2Instance".into(),
            properties: json!({"region": "us-east-1", "ImageId": "ami-1"}),
            resource: Resource::default(),
        }
    }

    fn step(component: &str, action: Action) -> WorkflowStep {
        WorkflowStep {
            component: component.into(),
            action,
        }
    }

    fn backend(definitions: Vec<WorkflowDefinition>) -> (LocalBackend, Arc<AtomicUsize>) {
        slow_backend(definitions, Duration::from_millis(20))
    }

    fn slow_backend(definitions: Vec<WorkflowDefinition>, delay: Duration) -> (LocalBackend, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor = ActionExecutor::new(Box::new(CountingProvider {
            calls: Arc::clone(&calls),
            delay,
        }));
        let backend = LocalBackend::new(executor)
            .with_definitions(definitions)
            .with_components([component("web")]);
        (backend, calls)
    }

    fn ok(response: ApiResponse<WorkflowRunResponse>) -> WorkflowRunResponse {
        match response {
            ApiResponse::Ok(r) => r,
            ApiResponse::Error { error } => panic!("unexpected error: {}", error.message),
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order_and_record_outcome() {
        let (backend, calls) = backend(vec![WorkflowDefinition {
            id: 7,
            name: "recycle".into(),
            steps: vec![step("web", Action::Create), step("web", Action::Delete)],
        }]);

        let response = ok(backend
            .dispatch(WorkflowRunRequest::new(7, Visibility::head()))
            .await
            .unwrap());

        assert_eq!(response.workflow_runner_state.status, WorkflowStatus::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(response.logs.last().map(String::as_str), Some("workflow success"));
        assert!(!backend.components().await[0].resource.provisioned);

        let history = backend.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, WorkflowStatus::Running);
        assert_eq!(history[0].id, history[1].id);
        assert_ne!(history[0].pk, history[1].pk);
    }

    #[tokio::test]
    async fn test_first_failing_step_stops_the_run() {
        let (backend, calls) = backend(vec![WorkflowDefinition {
            id: 1,
            name: "broken".into(),
            steps: vec![
                step("web", Action::Delete),
                step("web", Action::Create),
            ],
        }]);

        let response = ok(backend
            .dispatch(WorkflowRunRequest::new(1, Visibility::head()))
            .await
            .unwrap());

        assert_eq!(response.workflow_runner_state.status, WorkflowStatus::Failure);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(response.logs.iter().any(|l| l.contains("not provisioned")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_creates_are_serialized() {
        let (backend, calls) = backend(vec![WorkflowDefinition {
            id: 1,
            name: "create".into(),
            steps: vec![step("web", Action::Create)],
        }]);

        let (a, b) = tokio::join!(
            backend.dispatch(WorkflowRunRequest::new(1, Visibility::head())),
            backend.dispatch(WorkflowRunRequest::new(1, Visibility::head())),
        );
        let mut statuses = vec![
            ok(a.unwrap()).workflow_runner_state.status,
            ok(b.unwrap()).workflow_runner_state.status,
        ];
        statuses.sort_by_key(|s| *s == WorkflowStatus::Failure);

        assert_eq!(statuses, vec![WorkflowStatus::Success, WorkflowStatus::Failure]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_run_is_recorded_as_failure() {
        let (backend, calls) = slow_backend(
            vec![WorkflowDefinition {
                id: 3,
                name: "slow".into(),
                steps: vec![step("web", Action::Create)],
            }],
            Duration::from_millis(300),
        );
        let backend = Arc::new(backend);
        let runner = WorkflowRunner::new(backend.clone(), Duration::from_millis(50));

        assert!(matches!(
            runner.run(3, Visibility::head()).await,
            Err(RunError::Timeout(_))
        ));

        let history = backend.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, WorkflowStatus::Running);
        assert_eq!(history[1].status, WorkflowStatus::Failure);
        assert_eq!(history[0].id, history[1].id);

        // The step already handed to the blocking pool still completes
        assert!(backend.components().await[0].resource.provisioned);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.history().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_workflow_is_error_payload() {
        let (backend, _) = backend(vec![]);
        let response = backend
            .dispatch(WorkflowRunRequest::new(99, Visibility::head()))
            .await
            .unwrap();
        assert_eq!(response, ApiResponse::error(NOT_FOUND, "workflow 99 not found"));
        assert!(backend.history().is_empty());
    }

    #[test]
    fn test_history_continues_numbering() {
        let (backend, _) = backend(vec![]);
        let now = Utc::now();
        let backend = backend.with_history(vec![WorkflowRunnerState {
            id: 4,
            pk: 9,
            workflow_runner_id: 4,
            status: WorkflowStatus::Success,
            created_at: now,
            updated_at: now,
        }]);
        assert_eq!(backend.next_pk.load(Ordering::SeqCst), 10);
        assert_eq!(backend.next_runner_id.load(Ordering::SeqCst), 5);
    }
}
