//! Graph nodes and edges -- the topology side of the pairing.
//!
//! A [`GraphNode`] is an opaque property bag plus the data every node must
//! carry: the shared handle id, the `name`, and the meta-type classification.
//! Properties use an `IndexMap` so serialization and iteration order are
//! deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::HandleId;
use crate::meta::{MetaType, RelationType};

/// Free-form node/edge properties keyed by string.
pub type PropertyMap = IndexMap<String, Value>;

/// One node in the topology store, paired with the entity handle of the
/// same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Identifier shared with the entity handle.
    pub id: HandleId,
    /// Mirrored from the handle's display name.
    pub name: String,
    /// Topological classification; must agree with the handle's meta-type.
    pub meta_type: MetaType,
    /// Free-form domain properties (ip addresses, rack units, ...).
    pub properties: PropertyMap,
}

impl GraphNode {
    /// A fresh node with an empty property bag.
    pub fn new(id: HandleId, name: impl Into<String>, meta_type: MetaType) -> Self {
        GraphNode {
            id,
            name: name.into(),
            meta_type,
            properties: PropertyMap::new(),
        }
    }

    /// Returns a property value, if present.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A typed, directed edge between two graph nodes.
///
/// Source and target ids are kept by the store alongside the edge; the edge
/// weight itself carries the relationship type and an optional property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub relation: RelationType,
    pub properties: PropertyMap,
}

impl GraphEdge {
    /// A bare edge of the given relationship type.
    pub fn new(relation: RelationType) -> Self {
        GraphEdge {
            relation,
            properties: PropertyMap::new(),
        }
    }
}
