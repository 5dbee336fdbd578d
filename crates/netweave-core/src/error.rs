//! Core error types for netweave-core.
//!
//! Uses `thiserror` for structured, matchable error variants. The core model
//! is pure data, so the failure modes here are parse and validation errors;
//! storage and lifecycle failures live in their own crates.

use thiserror::Error;

/// Core errors produced by the netweave-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored meta-type string did not match any known role.
    #[error("invalid meta-type: '{value}'")]
    InvalidMetaType { value: String },

    /// A stored relationship-type string did not match any known type.
    #[error("invalid relationship type: '{value}'")]
    InvalidRelationType { value: String },

    /// A stored verb string did not match any audit verb.
    #[error("invalid activity verb: '{value}'")]
    InvalidVerb { value: String },
}
