//! # actionkit
//!
//! Idempotent provisioning actions executed through external provider CLIs.
//!
//! - **Component**: an entity rendered for one system, plus the external
//!   resource it owns once created
//! - **ActionHandler**: turns `(component, action)` into a provider call
//! - **Provider**: runs the call once ([`CliProvider`] spawns a process)
//! - **ActionExecutor**: guards against duplicate creates and missing
//!   resources, invokes the provider and parses its JSON output
//!
//! ## Example
//!
//! ```no_run
//! use actionkit::{Action, ActionExecutor, CliProvider, Component};
//! use entitystore::{Entity, SystemName};
//!
//! let entity = Entity::new("web-1", "awsEc2Instance", "web")
//!     .with_property("region".parse()?, "us-east-1")
//!     .with_property("ImageId".parse()?, "ami-0abc");
//! let mut component = Component::from_entity(&entity, &SystemName::baseline());
//!
//! let executor = ActionExecutor::new(Box::new(CliProvider::new()));
//! executor.apply(&mut component, Action::Create)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod executor;
pub mod handler;
pub mod provider;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use executor::ActionExecutor;
pub use handler::{ActionHandler, Ec2InstanceHandler};
pub use provider::{CliProvider, Provider};
pub use types::{Action, Component, Invocation, ProviderOutput, Resource};
