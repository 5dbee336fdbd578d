//! Stable ID newtypes shared by the relational and graph stores.
//!
//! All IDs are distinct newtype wrappers over `i64`, providing type safety
//! so that a `HandleId` cannot be accidentally used where an `EdgeId` is
//! expected. A `HandleId` is the identifier shared by an entity's handle row
//! and its paired graph node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable entity identifier. Assigned by the handle store's primary key and
/// mirrored into the paired graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(pub i64);

/// Stable edge identifier, assigned by the topology store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub i64);

// Display implementations -- just print the inner value.

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
