use crate::paths;
use anyhow::{Context, Result};
use entitystore::{PropertyPath, SystemName};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use workflow::WorkflowDefinition;

/// Name of the config file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Config Schema
// ============================================================================

/// The infragraph configuration (`config.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// System whose values commands render by default
    pub system: String,

    pub provider: ProviderConfig,

    pub qualification: QualificationConfig,

    pub workflow: WorkflowConfig,

    /// Workflow definitions available to `workflow run`
    pub workflows: Vec<WorkflowDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Run every provider command through this program instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationConfig {
    /// Per-check timeout
    pub timeout_secs: u64,

    /// Property paths every entity must resolve
    pub required: Vec<String>,

    /// External validator (program followed by its arguments)
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Deadline for a whole run
    pub timeout_secs: u64,

    /// Remote API root; runs execute locally when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: entitystore::BASELINE.to_string(),
            provider: ProviderConfig::default(),
            qualification: QualificationConfig::default(),
            workflow: WorkflowConfig::default(),
            workflows: Vec::new(),
        }
    }
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: intel::qualification::DEFAULT_TIMEOUT.as_secs(),
            required: Vec::new(),
            command: Vec::new(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout_secs: workflow::runner::DEFAULT_TIMEOUT.as_secs(),
            endpoint: None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Path of the config file
    pub fn path() -> Result<PathBuf> {
        Ok(paths::config_dir()?.join(CONFIG_FILE))
    }

    /// Load the config file, or return defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// System to use, preferring an explicit command-line value
    pub fn system(&self, explicit: Option<&str>) -> SystemName {
        SystemName::new(explicit.unwrap_or(&self.system))
    }

    /// Required property paths, parsed
    pub fn required_paths(&self) -> Result<Vec<PropertyPath>> {
        self.qualification
            .required
            .iter()
            .map(|p| {
                p.parse::<PropertyPath>()
                    .with_context(|| format!("Invalid required property path: {p:?}"))
            })
            .collect()
    }

    pub fn find_workflow(&self, id: i64) -> Option<&WorkflowDefinition> {
        self.workflows.iter().find(|w| w.id == id)
    }
}

// ============================================================================
// Tests
// ============================================================================
