//! Entity handles and type definitions -- the relational side of the pairing.
//!
//! An [`EntityHandle`] is the durable record for one documented object. It
//! exists iff a paired graph node with the same id exists; the lifecycle
//! engine owns that invariant. The handle carries the data shared with the
//! node (display name, declared type, meta-type) plus creator/modifier
//! bookkeeping.

use serde::{Deserialize, Serialize};

use crate::id::HandleId;
use crate::meta::MetaType;
use crate::time::now_millis;

/// A declared entity type (Router, Cable, Site, ...).
///
/// The `slug` is the unique key used everywhere in storage; `name` is the
/// human form. Deleting a type definition cascades to every handle of that
/// type (engine-driven, so node pairing and audit are honored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub slug: String,
}

impl TypeDefinition {
    /// Builds a definition from a slug, deriving the display name by
    /// title-casing the slug: `external-equipment` -> `External Equipment`.
    pub fn from_slug(slug: &str) -> Self {
        let name = slug
            .split('-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        TypeDefinition {
            name,
            slug: slug.to_string(),
        }
    }

    /// The node label form of the type name (`Optical Node` -> `Optical_Node`).
    pub fn label(&self) -> String {
        self.name.replace(' ', "_")
    }
}

/// The relational record for a documented object, paired 1:1 with a graph
/// node sharing its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHandle {
    /// Durable primary key, shared with the paired graph node.
    pub id: HandleId,
    /// Display name, mirrored into the node's `name` property.
    pub display_name: String,
    /// Slug of the declared [`TypeDefinition`].
    pub type_slug: String,
    /// Topological role; must agree with the node's classification.
    pub meta_type: MetaType,
    pub creator: String,
    pub created_at: i64,
    pub modifier: String,
    pub modified_at: i64,
}

impl EntityHandle {
    /// Human identity used in audit payloads: "Router foo.example.net".
    pub fn describe(&self) -> String {
        format!("{} {}", self.type_slug, self.display_name)
    }

    /// Refreshes the modifier bookkeeping after a mutation.
    pub fn touch(&mut self, actor: &str) {
        self.modifier = actor.to_string();
        self.modified_at = now_millis();
    }
}

/// Insertion payload for a new handle; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewHandle {
    pub display_name: String,
    pub type_slug: String,
    pub meta_type: MetaType,
    pub actor: String,
}
