//! # intel
//!
//! Property inference and qualification for entity graphs.
//!
//! - **Rules** derive properties of an entity from its own values and from
//!   related entities, found by type through an [`InferContext`]
//! - **Graph passes** run every rule in parallel until the graph settles
//! - **Qualifications** run async checks and stream their lifecycle events
//!
//! ## Example
//!
//! ```
//! use entitystore::{Entity, SystemName};
//! use intel::{InferOptions, InferenceRegistry, infer_graph};
//!
//! let graph = vec![
//!     Entity::new("d1", "k8sDeployment", "web"),
//!     Entity::new("ns1", "k8sNamespace", "prod"),
//! ];
//! let report = infer_graph(graph, &InferenceRegistry::builtin(), &InferOptions::default())?;
//!
//! let deployment = report.entity(&"d1".into()).unwrap();
//! assert_eq!(
//!     deployment.get_property(&"metadata.namespace".parse()?, &SystemName::baseline()),
//!     Some(&"prod".into())
//! );
//! # Ok::<(), intel::InferError>(())
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod qualification;
pub mod rules;

pub use context::InferContext;
pub use engine::{
    EntityFailure, GraphReport, InferOptions, InferenceRegistry, infer_graph, infer_store,
};
pub use error::{InferError, QualificationError, Result};
pub use qualification::checks::{CommandCheck, RequiredProperties};
pub use qualification::{
    Check, CheckOutcome, Qualification, QualificationEvent, QualificationLog, QualificationRunner,
    QualificationStatus, Subscription,
};
