//! Error types for the entity store

use crate::change_set::{ChangeSetStatus, EditSessionStatus};
use crate::types::{ChangeSetPk, EditSessionPk, EntityId, PropertyPath, SystemName};
use thiserror::Error;

/// A single conflicting write detected while merging an overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Entity the conflicting write targets
    pub entity_id: EntityId,
    /// Property path written by both sides
    pub path: PropertyPath,
    /// System the conflicting values live under
    pub system: SystemName,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.entity_id, self.path, self.system)
    }
}

/// Errors that can occur during entity store operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed path, request or visibility
    #[error("validation error: {0}")]
    Validation(String),

    /// A property lookup had neither a system value nor a baseline value
    #[error("property {path} has no value for system {system} (and no baseline)")]
    UnresolvedProperty {
        path: PropertyPath,
        system: SystemName,
    },

    /// Entity does not exist in the requested visibility
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Entity already exists in the requested visibility
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityId),

    /// Change set does not exist
    #[error("change set not found: {0}")]
    ChangeSetNotFound(ChangeSetPk),

    /// Edit session does not exist
    #[error("edit session not found: {0}")]
    EditSessionNotFound(EditSessionPk),

    /// Change set is no longer open for writes
    #[error("change set {pk} is {status}, not open")]
    ChangeSetNotOpen {
        pk: ChangeSetPk,
        status: ChangeSetStatus,
    },

    /// Edit session is no longer open for writes
    #[error("edit session {pk} is {status}, not open")]
    EditSessionNotOpen {
        pk: EditSessionPk,
        status: EditSessionStatus,
    },

    /// Concurrent edits touched the same path/system
    #[error("merge conflict on {} path(s): {}", .0.len(), format_conflicts(.0))]
    MergeConflict(Vec<Conflict>),
}

fn format_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for entity store operations
pub type Result<T> = std::result::Result<T, Error>;
