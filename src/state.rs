use crate::paths;
use actionkit::Resource;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use workflow::WorkflowRunnerState;

/// Name of the state file inside the state directory
pub const STATE_FILE: &str = "state.json";

// ============================================================================
// State Structures
// ============================================================================

/// Everything infragraph remembers between invocations
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct State {
    /// Provisioned resources, keyed by component id
    #[serde(default)]
    pub resources: BTreeMap<String, Resource>,

    /// Workflow runner transitions, oldest first
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRunnerState>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            resources: BTreeMap::new(),
            workflow_runs: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

impl State {
    /// Path of the state file
    pub fn path() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join(STATE_FILE))
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: State = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self) -> Result<()> {
        self.last_updated = Utc::now();
        self.save()
    }

    // ========================================================================
    // Resource Helpers
    // ========================================================================

    /// Recorded resource of a component, empty if never provisioned
    pub fn resource(&self, component_id: &str) -> Resource {
        self.resources.get(component_id).cloned().unwrap_or_default()
    }

    /// Record a component's resource; an empty resource is forgotten
    pub fn record_resource(&mut self, component_id: &str, resource: Resource) {
        if !resource.provisioned && resource.data.is_none() {
            self.resources.remove(component_id);
        } else {
            self.resources.insert(component_id.to_string(), resource);
        }
    }

    pub fn provisioned_count(&self) -> usize {
        self.resources.values().filter(|r| r.provisioned).count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use workflow::WorkflowStatus;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = TempDir::new().unwrap();
        let state = State::load_from(&dir.path().join(STATE_FILE)).unwrap();
        assert!(state.resources.is_empty());
        assert!(state.workflow_runs.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(STATE_FILE);

        let now = Utc::now();
        let mut state = State::default();
        state.record_resource(
            "web",
            Resource {
                provisioned: true,
                data: Some(json!({"Instances": [{"InstanceId": "i-1"}]})),
            },
        );
        state.workflow_runs.push(WorkflowRunnerState {
            id: 1,
            pk: 1,
            workflow_runner_id: 1,
            status: WorkflowStatus::Success,
            created_at: now,
            updated_at: now,
        });
        state.save_to(&path).unwrap();

        let loaded = State::load_from(&path).unwrap();
        assert!(loaded.resource("web").provisioned);
        assert_eq!(loaded.provisioned_count(), 1);
        assert_eq!(loaded.workflow_runs.len(), 1);
        assert_eq!(loaded.workflow_runs[0].status, WorkflowStatus::Success);
    }

    #[test]
    fn test_empty_resource_is_forgotten() {
        let mut state = State::default();
        state.record_resource(
            "web",
            Resource {
                provisioned: true,
                data: None,
            },
        );
        assert_eq!(state.resources.len(), 1);

        state.record_resource("web", Resource::default());
        assert!(state.resources.is_empty());
        assert!(!state.resource("web").provisioned);
    }

    #[test]
    fn test_corrupt_state_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE);
        fs::write(&path, "{not json").unwrap();
        assert!(State::load_from(&path).is_err());
    }
}
