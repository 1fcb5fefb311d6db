//! Core types for provisioning actions.

use entitystore::{Entity, SystemName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A provisioning action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// The external counterpart of a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Set once a create has succeeded, cleared by delete
    #[serde(default)]
    pub provisioned: bool,
    /// Provider output of the last successful create or update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An entity materialized for one system, ready to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub kind: String,
    /// Resolved properties for the target system
    pub properties: Value,
    #[serde(default)]
    pub resource: Resource,
}

impl Component {
    /// Render an entity's properties for `system`.
    pub fn from_entity(entity: &Entity, system: &SystemName) -> Self {
        Self {
            id: entity.id.to_string(),
            name: entity.name.clone(),
            kind: entity.entity_type.clone(),
            properties: entity.properties.render(system),
            resource: Resource::default(),
        }
    }

    /// Attach an existing resource (e.g. loaded from state).
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    pub fn is_provisioned(&self) -> bool {
        self.resource.provisioned
    }

    /// Look up a top-level property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    /// Persist the outcome of a successful action.
    ///
    /// Create and update store the provider data; an update that returned
    /// nothing keeps the previous data. Delete clears the resource.
    pub fn record(&mut self, action: Action, data: Value) {
        match action {
            Action::Create => {
                self.resource = Resource {
                    provisioned: true,
                    data: Some(data),
                };
            }
            Action::Update => {
                self.resource.provisioned = true;
                if !data.is_null() {
                    self.resource.data = Some(data);
                }
            }
            Action::Delete => self.resource = Resource::default(),
        }
    }
}

/// An external program call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Program and leading subcommands, without option values.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(
            self.args
                .iter()
                .take_while(|a| !a.starts_with("--"))
                .map(String::as_str),
        );
        parts.join(" ")
    }
}

/// Captured result of a provider call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProviderOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
