//! Error types for inference and qualification

use crate::qualification::QualificationStatus;
use entitystore::{EntityId, PropertyPath};
use thiserror::Error;

/// Errors raised while inferring one entity's properties
///
/// These are scoped to a single entity; a graph pass reports them next to
/// the entities that inferred cleanly.
#[derive(Debug, Error)]
pub enum InferError {
    /// An own-property the rule cannot work without is absent
    #[error("{entity_id}: missing required property {path}")]
    MissingRequiredProperty {
        entity_id: EntityId,
        path: PropertyPath,
    },

    /// A property holds a value the rule cannot interpret
    #[error("{entity_id}: invalid value at {path}: {message}")]
    InvalidValue {
        entity_id: EntityId,
        path: PropertyPath,
        message: String,
    },

    /// Entity store error (bad path, unknown visibility, ...)
    #[error(transparent)]
    Store(#[from] entitystore::Error),

    /// The worker pool for a graph pass could not be built
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}

/// Result type for inference operations
pub type Result<T> = std::result::Result<T, InferError>;

/// Errors raised by the qualification log
#[derive(Debug, Error)]
pub enum QualificationError {
    /// A transition that would rewrite or skip part of the lifecycle
    #[error("{entity_id}/{check_name}: invalid transition {from:?} -> {to}")]
    InvalidTransition {
        entity_id: EntityId,
        check_name: String,
        from: Option<QualificationStatus>,
        to: QualificationStatus,
    },
}
