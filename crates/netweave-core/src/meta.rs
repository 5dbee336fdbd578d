//! Meta-types and typed relationships.
//!
//! Every entity carries a meta-type -- its topological role -- which governs
//! which relationship types it may originate and which deletion rules apply
//! to it. The rule table in [`RelationType::allows`] is the single source of
//! truth for which (source role, relationship, target role) combinations are
//! valid in the topology.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The topological role of an entity.
///
/// `Logical` and `Physical` are the only transition targets of the
/// lifecycle engine's state machine; `Relation` (organisations, contacts)
/// and `Location` (sites, racks) never change role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaType {
    Physical,
    Logical,
    Relation,
    Location,
}

impl MetaType {
    /// All meta-types, in the order the original data model declares them.
    pub const ALL: [MetaType; 4] = [
        MetaType::Physical,
        MetaType::Logical,
        MetaType::Relation,
        MetaType::Location,
    ];

    /// Stable string form used in storage columns and node labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaType::Physical => "Physical",
            MetaType::Logical => "Logical",
            MetaType::Relation => "Relation",
            MetaType::Location => "Location",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Physical" => Ok(MetaType::Physical),
            "Logical" => Ok(MetaType::Logical),
            "Relation" => Ok(MetaType::Relation),
            "Location" => Ok(MetaType::Location),
            other => Err(CoreError::InvalidMetaType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, directed relationships between graph nodes.
///
/// The storage string forms keep the domain vocabulary of the inventory
/// model (`Part_of`, `Located_in`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Physical containment (chassis has ports, site has racks).
    Has,
    /// A logical component carried by a physical entity.
    PartOf,
    /// Physical placement in a location.
    LocatedIn,
    /// Physical ownership by an organisation.
    Owns,
    /// Logical ownership (usage) by an organisation.
    Uses,
    /// Logical dependency on another entity.
    DependsOn,
    /// An organisation responsible for a location.
    ResponsibleFor,
    /// Cable connectivity between physical entities.
    ConnectedTo,
    /// An organisation provisioning an entity.
    Provides,
}

impl RelationType {
    /// Stable string form used in storage columns and audit payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Has => "Has",
            RelationType::PartOf => "Part_of",
            RelationType::LocatedIn => "Located_in",
            RelationType::Owns => "Owns",
            RelationType::Uses => "Uses",
            RelationType::DependsOn => "Depends_on",
            RelationType::ResponsibleFor => "Responsible_for",
            RelationType::ConnectedTo => "Connected_to",
            RelationType::Provides => "Provides",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Has" => Ok(RelationType::Has),
            "Part_of" => Ok(RelationType::PartOf),
            "Located_in" => Ok(RelationType::LocatedIn),
            "Owns" => Ok(RelationType::Owns),
            "Uses" => Ok(RelationType::Uses),
            "Depends_on" => Ok(RelationType::DependsOn),
            "Responsible_for" => Ok(RelationType::ResponsibleFor),
            "Connected_to" => Ok(RelationType::ConnectedTo),
            "Provides" => Ok(RelationType::Provides),
            other => Err(CoreError::InvalidRelationType {
                value: other.to_string(),
            }),
        }
    }

    /// Returns `true` if an edge of this type may run from a `source` node
    /// to a `target` node with the given meta-types.
    ///
    /// `Owns` originates only from `Physical`, `Uses` only from `Logical`;
    /// the two are the mutually exclusive ownership forms the transition
    /// state machine rewrites between.
    pub fn allows(&self, source: MetaType, target: MetaType) -> bool {
        use MetaType::*;
        match self {
            RelationType::Has => matches!(
                (source, target),
                (Physical, Physical) | (Location, Location) | (Location, Physical)
            ),
            RelationType::PartOf => matches!((source, target), (Physical, Logical)),
            RelationType::LocatedIn => {
                matches!((source, target), (Physical, Location) | (Location, Location))
            }
            RelationType::Owns => matches!((source, target), (Physical, Relation)),
            RelationType::Uses => matches!((source, target), (Logical, Relation)),
            RelationType::DependsOn => {
                matches!((source, target), (Logical, Logical) | (Logical, Physical))
            }
            RelationType::ResponsibleFor => matches!((source, target), (Relation, Location)),
            RelationType::ConnectedTo => matches!((source, target), (Physical, Physical)),
            RelationType::Provides => {
                matches!((source, target), (Relation, Logical) | (Relation, Physical))
            }
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_type_string_roundtrip() {
        for meta in MetaType::ALL {
            assert_eq!(MetaType::parse(meta.as_str()).unwrap(), meta);
        }
    }

    #[test]
    fn meta_type_parse_rejects_unknown() {
        assert!(matches!(
            MetaType::parse("Virtual"),
            Err(CoreError::InvalidMetaType { .. })
        ));
    }

    #[test]
    fn relation_type_string_roundtrip() {
        let all = [
            RelationType::Has,
            RelationType::PartOf,
            RelationType::LocatedIn,
            RelationType::Owns,
            RelationType::Uses,
            RelationType::DependsOn,
            RelationType::ResponsibleFor,
            RelationType::ConnectedTo,
            RelationType::Provides,
        ];
        for rel in all {
            assert_eq!(RelationType::parse(rel.as_str()).unwrap(), rel);
        }
    }

    #[test]
    fn ownership_edges_are_role_exclusive() {
        assert!(RelationType::Owns.allows(MetaType::Physical, MetaType::Relation));
        assert!(!RelationType::Owns.allows(MetaType::Logical, MetaType::Relation));
        assert!(RelationType::Uses.allows(MetaType::Logical, MetaType::Relation));
        assert!(!RelationType::Uses.allows(MetaType::Physical, MetaType::Relation));
    }

    #[test]
    fn located_in_originates_from_physical_or_location() {
        assert!(RelationType::LocatedIn.allows(MetaType::Physical, MetaType::Location));
        assert!(RelationType::LocatedIn.allows(MetaType::Location, MetaType::Location));
        assert!(!RelationType::LocatedIn.allows(MetaType::Logical, MetaType::Location));
        assert!(!RelationType::LocatedIn.allows(MetaType::Physical, MetaType::Physical));
    }

    #[test]
    fn depends_on_originates_from_logical_only() {
        assert!(RelationType::DependsOn.allows(MetaType::Logical, MetaType::Physical));
        assert!(RelationType::DependsOn.allows(MetaType::Logical, MetaType::Logical));
        assert!(!RelationType::DependsOn.allows(MetaType::Physical, MetaType::Logical));
    }
}
