//! Audit-log records.
//!
//! Every successful create/update/delete of an entity or relationship is
//! reported as one [`ActivityRecord`]. Records are append-only; the core
//! never mutates or deletes them. History views consume them elsewhere.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::HandleId;
use crate::meta::RelationType;
use crate::time::now_millis;

/// The mutation kind an activity record reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    Create,
    Update,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "create" => Ok(Verb::Create),
            "update" => Ok(Verb::Update),
            "delete" => Ok(Verb::Delete),
            other => Err(CoreError::InvalidVerb {
                value: other.to_string(),
            }),
        }
    }
}

/// Structured detail attached to an activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type")]
pub enum ActivityPayload {
    /// Entity created or deleted. `object_name` keeps the identity readable
    /// after the entity row is gone.
    #[serde(rename = "node")]
    Entity { object_name: String },

    /// One property of an entity changed.
    #[serde(rename = "node_property")]
    EntityProperty {
        property: String,
        value_before: serde_json::Value,
        value_after: serde_json::Value,
    },

    /// A relationship was created or deleted between two entities.
    #[serde(rename = "relationship")]
    Relationship {
        relationship_type: RelationType,
        object_name: Option<String>,
    },
}

/// One immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub actor: String,
    pub verb: Verb,
    /// The entity the mutation acted on.
    pub subject: HandleId,
    /// The other end, for relationship events.
    pub related: Option<HandleId>,
    pub payload: ActivityPayload,
    pub timestamp_ms: i64,
}

impl ActivityRecord {
    pub fn new(
        actor: impl Into<String>,
        verb: Verb,
        subject: HandleId,
        related: Option<HandleId>,
        payload: ActivityPayload,
    ) -> Self {
        ActivityRecord {
            actor: actor.into(),
            verb,
            subject,
            related,
            payload,
            timestamp_ms: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verb_string_roundtrip() {
        for verb in [Verb::Create, Verb::Update, Verb::Delete] {
            assert_eq!(Verb::parse(verb.as_str()).unwrap(), verb);
        }
        assert!(Verb::parse("merge").is_err());
    }

    #[test]
    fn payload_tags_match_history_consumers() {
        let payload = ActivityPayload::EntityProperty {
            property: "os".into(),
            value_before: json!("ios"),
            value_after: json!("junos"),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["action_type"], "node_property");

        let payload = ActivityPayload::Relationship {
            relationship_type: RelationType::LocatedIn,
            object_name: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["action_type"], "relationship");
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = ActivityRecord::new(
            "alice",
            Verb::Delete,
            HandleId(4),
            Some(HandleId(7)),
            ActivityPayload::Relationship {
                relationship_type: RelationType::Has,
                object_name: Some("rack r2".into()),
            },
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: ActivityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
