//! Action executor - guards, provider call and output parsing

use crate::error::{Error, Result};
use crate::handler::{ActionHandler, Ec2InstanceHandler};
use crate::provider::Provider;
use crate::types::{Action, Component};
use serde_json::Value;
use std::collections::BTreeMap;

/// Executes actions against components through one provider
pub struct ActionExecutor {
    provider: Box<dyn Provider>,
    handlers: BTreeMap<String, Box<dyn ActionHandler>>,
}

impl ActionExecutor {
    /// Executor with the built-in handlers registered
    pub fn new(provider: Box<dyn Provider>) -> Self {
        let mut executor = Self::empty(provider);
        executor.register(Box::new(Ec2InstanceHandler));
        executor
    }

    /// Executor with no handlers
    pub fn empty(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            handlers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.kind().to_string(), handler);
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Execute one action and return the provider's parsed output
    ///
    /// Guards run first: create on a provisioned component and update or
    /// delete on an unprovisioned one fail without calling the provider.
    /// The provider is called at most once. The component is not modified;
    /// see [`ActionExecutor::apply`].
    pub fn execute(&self, component: &Component, action: Action) -> Result<Value> {
        match (action, component.is_provisioned()) {
            (Action::Create, true) => {
                return Err(Error::ResourceAlreadyExists {
                    component: component.name.clone(),
                });
            }
            (Action::Update | Action::Delete, false) => {
                return Err(Error::ResourceNotProvisioned {
                    component: component.name.clone(),
                    action,
                });
            }
            _ => {}
        }

        let handler = self
            .handlers
            .get(&component.kind)
            .ok_or_else(|| Error::NoHandler {
                kind: component.kind.clone(),
            })?;
        let invocation = handler.invocation(component, action)?;

        let output = self.provider.execute(&invocation)?;
        if !output.success() {
            log::warn!("{} {} failed ({})", action, component.name, output.exit_code);
            return Err(Error::ActionExecutionFailed {
                command: invocation.summary(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let data = if output.stdout.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&output.stdout)?
        };
        log::info!("{} {}: done", action, component.name);
        Ok(data)
    }

    /// Execute and record the outcome on the component
    pub fn apply(&self, component: &mut Component, action: Action) -> Result<Value> {
        let data = self.execute(component, action)?;
        component.record(action, data.clone());
        Ok(data)
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
