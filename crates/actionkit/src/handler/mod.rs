//! Action handlers translate a component and an action into a provider call.

pub mod ec2;

use crate::error::Result;
use crate::types::{Action, Component, Invocation};

/// Translates actions for one component kind.
pub trait ActionHandler: Send + Sync {
    /// Component kind this handler serves
    fn kind(&self) -> &str;

    /// Build the provider call for `action`.
    ///
    /// Guards on resource state are checked by the executor before this is
    /// called.
    fn invocation(&self, component: &Component, action: Action) -> Result<Invocation>;
}

pub use ec2::Ec2InstanceHandler;
