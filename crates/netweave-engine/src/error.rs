//! Engine error types.
//!
//! Structural/validation errors ([`EngineError::DuplicateEntity`],
//! [`EngineError::TargetNotFound`], [`EngineError::InvalidRole`],
//! [`EngineError::DuplicateId`]) are returned to the immediate caller and
//! never retried. [`EngineError::ConsistencyViolation`] reports a failed
//! compensating action -- a detected, not silently ignored, inconsistency
//! between the two stores.

use thiserror::Error;

use netweave_core::{HandleId, MetaType, RelationType};
use netweave_store::StoreError;

/// Errors produced by lifecycle-engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unique-creation policy violated; carries the existing entity's id.
    #[error("entity already exists with id {existing}")]
    DuplicateEntity { existing: HandleId },

    /// The entity an operation acts on does not exist.
    #[error("entity not found: {id}")]
    EntityNotFound { id: HandleId },

    /// A relationship target id does not resolve to an existing node.
    #[error("relationship target not found: {id}")]
    TargetNotFound { id: HandleId },

    /// The relationship is forbidden for the source's current,
    /// non-convertible role.
    #[error("relationship {relation} not allowed for {meta_type} source")]
    InvalidRole {
        meta_type: MetaType,
        relation: RelationType,
    },

    /// A meta-type transition was requested on an entity not in the
    /// expected starting state.
    #[error("entity {id} is {actual}, expected {expected}")]
    InvalidTransition {
        id: HandleId,
        expected: MetaType,
        actual: MetaType,
    },

    /// No id generator with this name exists.
    #[error("id generator not found: '{name}'")]
    GeneratorNotFound { name: String },

    /// A caller-supplied identifier is already in active use.
    #[error("identifier already taken: '{value}'")]
    DuplicateId { value: String },

    /// Every issued candidate collided with the reservation ledger within
    /// the bounded retry budget.
    #[error("id space exhausted for generator '{generator}' after {attempts} attempts")]
    IdSpaceExhausted { generator: String, attempts: u32 },

    /// A compensating action failed, leaving the stores inconsistent.
    #[error("consistency violation: {reason}")]
    ConsistencyViolation { reason: String },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
