//! Error types for provisioning actions.
//!
//! Errors are categorized so callers can tell a guard refusal (nothing was
//! run) from a provider failure (something ran and failed), and show advice
//! that fits.

use crate::types::Action;
use thiserror::Error;

/// Categories of action errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A guard refused the action before any external call
    Guard,
    /// The component lacks data the action needs
    InvalidComponent,
    /// The provider program could not be started
    ProviderUnavailable,
    /// The provider ran and reported failure
    ProviderFailed,
    /// The provider's output could not be understood
    InvalidOutput,
}

impl ErrorCategory {
    /// Whether the provider was actually invoked.
    pub fn provider_invoked(&self) -> bool {
        matches!(self, Self::ProviderFailed | Self::InvalidOutput)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Guard => "Action refused",
            Self::InvalidComponent => "Incomplete component",
            Self::ProviderUnavailable => "Provider not available",
            Self::ProviderFailed => "Provider command failed",
            Self::InvalidOutput => "Unexpected provider output",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Guard => "Check the resource state; delete it before creating it again",
            Self::InvalidComponent => "Set the missing properties on the entity and infer again",
            Self::ProviderUnavailable => "Install the provider CLI or set provider.program in the config",
            Self::ProviderFailed => "Inspect the provider's stderr; the action was not retried",
            Self::InvalidOutput => "Check the provider version; its output was not JSON",
        }
    }
}

/// Errors that can occur while executing an action.
#[derive(Debug, Error)]
pub enum Error {
    /// Create requested for a component that already has a resource
    #[error("{component}: resource already exists")]
    ResourceAlreadyExists { component: String },

    /// Update or delete requested for a component with no resource
    #[error("{component}: cannot {action}, resource is not provisioned")]
    ResourceNotProvisioned { component: String, action: Action },

    /// No handler is registered for the component's kind
    #[error("no action handler for component kind {kind:?}")]
    NoHandler { kind: String },

    /// A property the action needs is missing or has the wrong type
    #[error("{component}: missing or invalid property {property}")]
    MissingProperty { component: String, property: String },

    /// The provider program could not be spawned
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider exited non-zero
    #[error("failure running {command} ({exit_code}): {stderr}")]
    ActionExecutionFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Provider stdout was not JSON
    #[error("invalid provider output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ResourceAlreadyExists { .. } | Error::ResourceNotProvisioned { .. } => {
                ErrorCategory::Guard
            }
            Error::NoHandler { .. } | Error::MissingProperty { .. } => {
                ErrorCategory::InvalidComponent
            }
            Error::Spawn { .. } => ErrorCategory::ProviderUnavailable,
            Error::ActionExecutionFailed { .. } => ErrorCategory::ProviderFailed,
            Error::InvalidOutput(_) => ErrorCategory::InvalidOutput,
        }
    }

    pub fn advice(&self) -> &'static str {
        self.category().advice()
    }
}

/// Result type for action operations.
pub type Result<T> = std::result::Result<T, Error>;
