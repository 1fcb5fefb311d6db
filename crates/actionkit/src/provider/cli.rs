//! Subprocess provider.

use super::Provider;
use crate::error::{Error, Result};
use crate::types::{Invocation, ProviderOutput};
use std::process::Command;

/// Provider that runs invocations as child processes.
#[derive(Debug, Clone, Default)]
pub struct CliProvider {
    /// Replaces the invocation's program (e.g. a wrapper script)
    program: Option<String>,
}

impl CliProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every invocation through `program` instead.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

impl Provider for CliProvider {
    fn execute(&self, invocation: &Invocation) -> Result<ProviderOutput> {
        let program = self.program.as_deref().unwrap_or(&invocation.program);
        log::debug!("running {} {}", program, invocation.summary());

        let output = Command::new(program)
            .args(&invocation.args)
            .output()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(ProviderOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_captures_exit_code_and_streams() {
        let provider = CliProvider::new();
        let inv = Invocation::new(
            "sh",
            vec!["-c".into(), "echo '{\"ok\":true}'; echo oops >&2; exit 3".into()],
        );
        let out = provider.execute(&inv).unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "{\"ok\":true}");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let provider = CliProvider::with_program("/nonexistent/aws");
        let err = provider
            .execute(&Invocation::new("aws", vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
