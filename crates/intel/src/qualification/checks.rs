//! Built-in checks

use super::{Check, CheckOutcome};
use anyhow::Context;
use async_trait::async_trait;
use entitystore::{Entity, PropertyPath, SystemName};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Fails when any listed property is unset for a system
#[derive(Debug, Clone)]
pub struct RequiredProperties {
    name: String,
    paths: Vec<PropertyPath>,
    system: SystemName,
}

impl RequiredProperties {
    pub fn new(paths: Vec<PropertyPath>, system: SystemName) -> Self {
        Self {
            name: "required-properties".to_string(),
            paths,
            system,
        }
    }
}

#[async_trait]
impl Check for RequiredProperties {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, entity: &Entity) -> anyhow::Result<CheckOutcome> {
        let missing: Vec<String> = self
            .paths
            .iter()
            .filter(|p| entity.get_property(p, &self.system).is_none_or(|v| v.is_null()))
            .map(ToString::to_string)
            .collect();

        if missing.is_empty() {
            Ok(CheckOutcome::success())
        } else {
            Ok(CheckOutcome::failure(format!(
                "missing for {}: {}",
                self.system,
                missing.join(", ")
            )))
        }
    }
}

/// Runs an external program with the entity's rendered properties on stdin
///
/// Exit code 0 is success, any other exit is failure. Failing to start the
/// program is an error. Output is stdout followed by stderr.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    name: String,
    program: String,
    args: Vec<String>,
    system: SystemName,
}

impl CommandCheck {
    pub fn new(name: &str, program: &str, args: Vec<String>, system: SystemName) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args,
            system,
        }
    }
}

#[async_trait]
impl Check for CommandCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, entity: &Entity) -> anyhow::Result<CheckOutcome> {
        let input = serde_json::to_vec(&entity.properties.render(&self.system))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // Programs that ignore stdin may close it early
            if let Err(e) = stdin.write_all(&input).await {
                log::debug!("{}: stdin closed early: {e}", self.program);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait for {}", self.program))?;

        let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr.trim());
        }
        let text = (!text.is_empty()).then_some(text);

        if output.status.success() {
            Ok(CheckOutcome::Success { output: text })
        } else {
            Ok(CheckOutcome::Failure { output: text })
        }
    }
}
