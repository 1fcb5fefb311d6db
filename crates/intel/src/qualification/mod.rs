//! Qualification checks and their event streams
//!
//! A check runs asynchronously against one entity. Subscribers see one
//! `running` event, then exactly one terminal event (`success`, `failure`
//! or `error`), whatever the check does: errors, panics and timeouts all
//! become `error`.

pub mod checks;

use crate::error::QualificationError;
use async_trait::async_trait;
use entitystore::{Entity, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default per-check deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Events
// ============================================================================

/// Lifecycle status of one check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualificationStatus {
    Running,
    Success,
    Failure,
    Error,
}

impl QualificationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for QualificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One status update for an `(entity, check)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationEvent {
    pub entity_id: EntityId,
    pub check_name: String,
    pub status: QualificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl QualificationEvent {
    fn new(entity_id: &EntityId, check_name: &str, status: QualificationStatus, output: Option<String>) -> Self {
        Self {
            entity_id: entity_id.clone(),
            check_name: check_name.to_string(),
            status,
            output,
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

/// What a check concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Success { output: Option<String> },
    Failure { output: Option<String> },
}

impl CheckOutcome {
    pub fn success() -> Self {
        Self::Success { output: None }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self::Failure {
            output: Some(output.into()),
        }
    }
}

/// A qualification check
///
/// Returning `Err` means the check could not decide (tool missing, bad
/// input); a definite "no" is [`CheckOutcome::Failure`].
#[async_trait]
pub trait Check: Send + Sync {
    /// Name reported in events
    fn name(&self) -> &str;

    async fn run(&self, entity: &Entity) -> anyhow::Result<CheckOutcome>;
}

// ============================================================================
// Runner
// ============================================================================

/// Receiving end of a check run's event stream
///
/// Dropping it stops delivery; checks already running are not interrupted.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<QualificationEvent>,
}

impl Subscription {
    /// Next event, or `None` once every check has finished
    pub async fn next(&mut self) -> Option<QualificationEvent> {
        self.rx.recv().await
    }

    /// Drain every remaining event
    pub async fn collect(mut self) -> Vec<QualificationEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}

/// Runs checks with a deadline and reports them as event streams
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct QualificationRunner {
    timeout: Duration,
}

impl Default for QualificationRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl QualificationRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start one check
    pub fn run(&self, entity: Arc<Entity>, check: Arc<dyn Check>) -> Subscription {
        self.run_all(entity, &[check])
    }

    /// Start several checks concurrently on one stream
    ///
    /// Every `running` event is queued before any check starts, so the
    /// stream always opens with them.
    pub fn run_all(&self, entity: Arc<Entity>, checks: &[Arc<dyn Check>]) -> Subscription {
        // Two events per check: the channel never blocks a sender.
        let (tx, rx) = mpsc::channel(checks.len().max(1) * 2);

        for check in checks {
            let started = QualificationEvent::new(&entity.id, check.name(), QualificationStatus::Running, None);
            if tx.try_send(started).is_err() {
                log::debug!("subscriber dropped before {} started", check.name());
            }
        }

        for check in checks {
            let tx = tx.clone();
            let entity = Arc::clone(&entity);
            let check = Arc::clone(check);
            let timeout = self.timeout;
            tokio::spawn(async move {
                let event = drive(entity, check, timeout).await;
                // A closed channel only means nobody is listening anymore.
                let _ = tx.send(event).await;
            });
        }

        Subscription { rx }
    }
}

/// Run a check to completion and produce its terminal event
async fn drive(entity: Arc<Entity>, check: Arc<dyn Check>, timeout: Duration) -> QualificationEvent {
    let name = check.name().to_string();
    let mut handle = {
        let entity = Arc::clone(&entity);
        tokio::spawn(async move { check.run(&entity).await })
    };

    let (status, output) = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(CheckOutcome::Success { output }))) => (QualificationStatus::Success, output),
        Ok(Ok(Ok(CheckOutcome::Failure { output }))) => (QualificationStatus::Failure, output),
        Ok(Ok(Err(e))) => (QualificationStatus::Error, Some(format!("{e:#}"))),
        Ok(Err(join)) => (QualificationStatus::Error, Some(format!("check panicked: {join}"))),
        Err(_) => {
            handle.abort();
            (
                QualificationStatus::Error,
                Some(format!("timed out after {}s", timeout.as_secs_f64())),
            )
        }
    };

    log::debug!("{} {}: {}", entity.id, name, status);
    QualificationEvent::new(&entity.id, &name, status, output)
}

// ============================================================================
// Log
// ============================================================================

/// Latest known state of one `(entity, check)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub entity_id: EntityId,
    pub check_name: String,
    pub status: QualificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Append-only record of qualification events
///
/// Enforces the lifecycle: `running` first, then one terminal status, and
/// nothing after that. A new run of a finished check starts again with
/// `running`.
#[derive(Debug, Clone, Default)]
pub struct QualificationLog {
    events: Vec<QualificationEvent>,
    latest: BTreeMap<(EntityId, String), Qualification>,
}

impl QualificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, rejecting invalid transitions
    pub fn record(&mut self, event: QualificationEvent) -> Result<(), QualificationError> {
        let key = (event.entity_id.clone(), event.check_name.clone());
        let from = self.latest.get(&key).map(|q| q.status);

        let valid = match (from, event.status) {
            // A fresh run may follow nothing or a finished run
            (None, QualificationStatus::Running) => true,
            (Some(prev), QualificationStatus::Running) => prev.is_terminal(),
            (Some(QualificationStatus::Running), _) => true,
            _ => false,
        };
        if !valid {
            return Err(QualificationError::InvalidTransition {
                entity_id: event.entity_id,
                check_name: event.check_name,
                from,
                to: event.status,
            });
        }

        self.latest.insert(
            key,
            Qualification {
                entity_id: event.entity_id.clone(),
                check_name: event.check_name.clone(),
                status: event.status,
                output: event.output.clone(),
            },
        );
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[QualificationEvent] {
        &self.events
    }

    pub fn get(&self, entity_id: &EntityId, check_name: &str) -> Option<&Qualification> {
        self.latest.get(&(entity_id.clone(), check_name.to_string()))
    }

    /// Latest state of every check on one entity
    pub fn for_entity<'a>(&'a self, entity_id: &'a EntityId) -> impl Iterator<Item = &'a Qualification> + 'a {
        self.latest.values().filter(move |q| &q.entity_id == entity_id)
    }

    /// True when every check recorded for the entity finished with success
    pub fn is_qualified(&self, entity_id: &EntityId) -> bool {
        let mut any = false;
        for q in self.for_entity(entity_id) {
            any = true;
            if q.status != QualificationStatus::Success {
                return false;
            }
        }
        any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(CheckOutcome);

    #[async_trait]
    impl Check for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn run(&self, _entity: &Entity) -> anyhow::Result<CheckOutcome> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl Check for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn run(&self, _entity: &Entity) -> anyhow::Result<CheckOutcome> {
            anyhow::bail!("kubectl not found")
        }
    }

    struct Panics;

    #[async_trait]
    impl Check for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run(&self, _entity: &Entity) -> anyhow::Result<CheckOutcome> {
            panic!("boom")
        }
    }

    struct Sleeps;

    #[async_trait]
    impl Check for Sleeps {
        fn name(&self) -> &str {
            "sleeps"
        }

        async fn run(&self, _entity: &Entity) -> anyhow::Result<CheckOutcome> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CheckOutcome::success())
        }
    }

    fn entity() -> Arc<Entity> {
        Arc::new(Entity::new("d1", "k8sDeployment", "web"))
    }

    fn statuses(events: &[QualificationEvent]) -> Vec<QualificationStatus> {
        events.iter().map(|e| e.status).collect()
    }

    #[tokio::test]
    async fn test_success_emits_running_then_success() {
        let runner = QualificationRunner::default();
        let events = runner
            .run(entity(), Arc::new(Fixed(CheckOutcome::success())))
            .collect()
            .await;
        assert_eq!(
            statuses(&events),
            vec![QualificationStatus::Running, QualificationStatus::Success]
        );
        assert_eq!(events[1].check_name, "fixed");
    }

    #[tokio::test]
    async fn test_failure_carries_output() {
        let runner = QualificationRunner::default();
        let events = runner
            .run(entity(), Arc::new(Fixed(CheckOutcome::failure("replicas < 1"))))
            .collect()
            .await;
        assert_eq!(events[1].status, QualificationStatus::Failure);
        assert_eq!(events[1].output.as_deref(), Some("replicas < 1"));
    }

    #[tokio::test]
    async fn test_check_error_and_panic_become_error_events() {
        let runner = QualificationRunner::default();
        let checks: Vec<Arc<dyn Check>> = vec![Arc::new(Broken), Arc::new(Panics)];
        let events = runner.run_all(entity(), &checks).collect().await;

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].status, QualificationStatus::Running);
        assert_eq!(events[1].status, QualificationStatus::Running);
        for event in &events[2..] {
            assert_eq!(event.status, QualificationStatus::Error);
        }
        let broken = events[2..].iter().find(|e| e.check_name == "broken").unwrap();
        assert!(broken.output.as_deref().unwrap().contains("kubectl not found"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_error() {
        let runner = QualificationRunner::new(Duration::from_millis(50));
        let events = runner.run(entity(), Arc::new(Sleeps)).collect().await;
        assert_eq!(
            statuses(&events),
            vec![QualificationStatus::Running, QualificationStatus::Error]
        );
        assert!(events[1].output.as_deref().unwrap().starts_with("timed out"));
    }

    #[tokio::test]
    async fn test_events_feed_the_log() {
        let runner = QualificationRunner::default();
        let mut sub = runner.run(entity(), Arc::new(Fixed(CheckOutcome::success())));
        let mut log = QualificationLog::new();
        while let Some(event) = sub.next().await {
            log.record(event).unwrap();
        }
        assert!(log.is_qualified(&"d1".into()));
        assert_eq!(log.events().len(), 2);
    }

    #[test]
    fn test_log_rejects_second_terminal_event() {
        let id: EntityId = "d1".into();
        let event = |status| QualificationEvent::new(&id, "c", status, None);
        let mut log = QualificationLog::new();

        assert!(log.record(event(QualificationStatus::Success)).is_err());
        log.record(event(QualificationStatus::Running)).unwrap();
        assert!(log.record(event(QualificationStatus::Running)).is_err());
        log.record(event(QualificationStatus::Failure)).unwrap();
        assert!(log.record(event(QualificationStatus::Success)).is_err());
        assert_eq!(log.get(&id, "c").unwrap().status, QualificationStatus::Failure);
        assert!(!log.is_qualified(&id));

        // A rerun starts over
        log.record(event(QualificationStatus::Running)).unwrap();
        assert_eq!(log.events().len(), 3);
    }
}
