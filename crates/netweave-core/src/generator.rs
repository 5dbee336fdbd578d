//! Unique-identifier templates and the reservation ledger records.
//!
//! An [`IdGenerator`] is a counter template: prefix, suffix, optional
//! zero-fill width, and a strictly increasing base counter. Formatting is
//! pure; advancing the counter is a store concern so it can be serialized
//! against concurrent issuers.
//!
//! A [`ReservedId`] is one row of the reservation ledger -- the sole source
//! of truth for "is this identifier already taken", independent of any
//! generator counter.

use serde::{Deserialize, Serialize};

use crate::time::now_millis;

/// A named identifier template with a durable counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGenerator {
    /// Unique key used to look the generator up.
    pub name: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Strictly increasing; mutated only by successful issuance.
    pub base_counter: i64,
    /// When set, the counter is left-padded with zeros to this width.
    pub zero_fill_width: Option<u32>,
    /// The most recently issued formatted id, if any.
    pub last_id: Option<String>,
    pub creator: String,
    pub created_at: i64,
    pub modifier: Option<String>,
    pub modified_at: i64,
}

impl IdGenerator {
    /// A fresh generator with its counter at 1.
    pub fn new(
        name: impl Into<String>,
        prefix: Option<String>,
        suffix: Option<String>,
        zero_fill_width: Option<u32>,
        creator: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        IdGenerator {
            name: name.into(),
            prefix,
            suffix,
            base_counter: 1,
            zero_fill_width,
            last_id: None,
            creator: creator.into(),
            created_at: now,
            modifier: None,
            modified_at: now,
        }
    }

    /// Formats an arbitrary counter value with this generator's template.
    pub fn format(&self, counter: i64) -> String {
        let digits = match self.zero_fill_width {
            Some(width) => format!("{:0>width$}", counter, width = width as usize),
            None => counter.to_string(),
        };
        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            digits,
            self.suffix.as_deref().unwrap_or("")
        )
    }

    /// The id the next issuance will produce, derived from the current
    /// counter without advancing it.
    pub fn next_id(&self) -> String {
        self.format(self.base_counter)
    }
}

/// One row of the reservation ledger.
///
/// `reserved = true` marks a pre-reservation that a later registration may
/// claim; `reserved = false` marks an id in active use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedId {
    pub value: String,
    pub reserved: bool,
    pub reserve_message: Option<String>,
    pub reserver: Option<String>,
    pub created_at: i64,
}

impl ReservedId {
    /// An in-use (non-reserved) ledger entry, as written by issuance and
    /// registration.
    pub fn taken(value: impl Into<String>) -> Self {
        ReservedId {
            value: value.into(),
            reserved: false,
            reserve_message: None,
            reserver: None,
            created_at: now_millis(),
        }
    }

    /// A soft reservation with bookkeeping about who reserved it and why.
    pub fn reservation(
        value: impl Into<String>,
        message: impl Into<String>,
        reserver: impl Into<String>,
    ) -> Self {
        ReservedId {
            value: value.into(),
            reserved: true,
            reserve_message: Some(message.into()),
            reserver: Some(reserver.into()),
            created_at: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nordunet_service_generator() -> IdGenerator {
        IdGenerator::new(
            "service_id",
            Some("NU-S".to_string()),
            None,
            Some(6),
            "admin",
        )
    }

    #[test]
    fn format_zero_fills_to_width() {
        let generator = nordunet_service_generator();
        assert_eq!(generator.format(1), "NU-S000001");
        assert_eq!(generator.format(2), "NU-S000002");
        assert_eq!(generator.format(1234567), "NU-S1234567");
    }

    #[test]
    fn format_without_zero_fill() {
        let generator = IdGenerator::new("plain", None, Some("-x".to_string()), None, "admin");
        assert_eq!(generator.format(42), "42-x");
    }

    #[test]
    fn next_id_is_derived_from_counter() {
        let mut generator = nordunet_service_generator();
        assert_eq!(generator.next_id(), "NU-S000001");
        generator.base_counter = 17;
        assert_eq!(generator.next_id(), "NU-S000017");
    }

    #[test]
    fn reservation_carries_bookkeeping() {
        let entry = ReservedId::reservation("NU-S000100", "import batch", "alice");
        assert!(entry.reserved);
        assert_eq!(entry.reserve_message.as_deref(), Some("import batch"));
        assert_eq!(entry.reserver.as_deref(), Some("alice"));
        assert!(!ReservedId::taken("cable1").reserved);
    }
}
