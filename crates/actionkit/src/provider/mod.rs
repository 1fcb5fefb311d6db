//! Provider abstraction for external calls.
//!
//! The [`Provider`] trait is the only place an action touches the outside
//! world, so executors can be tested against a mock.

pub mod cli;

use crate::error::Result;
use crate::types::{Invocation, ProviderOutput};

/// Runs one invocation to completion.
///
/// Implementations make exactly one attempt; retries are the caller's
/// decision.
pub trait Provider: Send + Sync {
    fn execute(&self, invocation: &Invocation) -> Result<ProviderOutput>;
}

pub use cli::CliProvider;
