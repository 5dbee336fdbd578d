//! Storage error types for netweave-store.
//!
//! [`StoreError`] covers the failure modes of both storage contracts:
//! missing rows/nodes, pairing-integrity violations, and the underlying
//! SQLite/serde failures of the durable backend.

use thiserror::Error;

use netweave_core::{CoreError, HandleId};

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query or constraint failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization of a property bag failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Schema migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// A stored enum string no longer parses (corrupt or future data).
    #[error("corrupt stored value: {0}")]
    Corrupt(#[from] CoreError),

    /// A graph node with this id already exists.
    #[error("node already exists: {id}")]
    DuplicateNode { id: HandleId },

    /// A graph node was not found.
    #[error("node not found: {id}")]
    NodeNotFound { id: HandleId },

    /// An entity handle row was not found.
    #[error("handle not found: {id}")]
    HandleNotFound { id: HandleId },

    /// An id generator with this name was not found.
    #[error("id generator not found: '{name}'")]
    GeneratorNotFound { name: String },

    /// An id generator with this name already exists.
    #[error("id generator already exists: '{name}'")]
    DuplicateGenerator { name: String },

    /// An edge endpoint does not resolve to an existing node.
    #[error("edge endpoint missing: {from} -> {to}")]
    DanglingEdge { from: HandleId, to: HandleId },

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    Integrity { reason: String },
}
