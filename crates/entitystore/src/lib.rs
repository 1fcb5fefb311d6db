//! # entitystore
//!
//! The entity graph that inference, diffing and qualification read from.
//!
//! ## Core Concepts
//!
//! - **Entity**: a modeled object with a [`PropertyTree`] of per-system values
//! - **System**: a named override context; `"baseline"` is the fallback
//! - **ChangeSet**: an isolated branch of proposed mutations
//! - **EditSession**: a working copy inside a change set, merged on save
//! - **Diff**: ordered `(path, system, old, new)` delta between two trees
//!
//! ## Example
//!
//! ```
//! use entitystore::{Entity, EntityStore, SystemName, Visibility};
//!
//! let mut store = EntityStore::new();
//! let cs = store.create_change_set("add namespace", None);
//! let es = store.create_edit_session(cs.pk)?;
//! let vis = Visibility::edit_session(cs.pk, es.pk);
//!
//! let ns = Entity::new("ns-1", "k8sNamespace", "prod")
//!     .with_property("metadata.name".parse()?, "prod");
//! store.insert_entity(vis, ns)?;
//!
//! // Invisible outside the session until saved
//! assert!(store.get_entity(&"ns-1".into(), Visibility::head()).is_err());
//! store.save_edit_session(es.pk)?;
//! store.apply_change_set(cs.pk)?;
//!
//! let ns = store.get_entity(&"ns-1".into(), Visibility::head())?;
//! assert_eq!(
//!     ns.get_property(&"metadata.name".parse()?, &SystemName::baseline()),
//!     Some(&"prod".into())
//! );
//! # Ok::<(), entitystore::Error>(())
//! ```

pub mod change_set;
pub mod diff;
pub mod entity;
pub mod error;
pub mod store;
pub mod tree;
pub mod types;

pub use change_set::{ChangeSet, ChangeSetStatus, EditSession, EditSessionStatus, Visibility};
pub use diff::{Diff, DiffEntry, DiffSummary, diff};
pub use entity::Entity;
pub use error::{Conflict, Error, Result};
pub use store::EntityStore;
pub use tree::{PropertyTree, SystemValues};
pub use types::{
    BASELINE, ChangeSetPk, EditSessionPk, EntityId, PropertyPath, PropertyValue, SystemName,
};
