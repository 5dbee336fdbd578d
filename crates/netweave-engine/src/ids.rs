//! Unique-identifier issuance and the reservation ledger operations.
//!
//! The counter and the ledger are two sources of truth that can drift (a
//! ledger pre-seeded by a bulk import may already hold future counter
//! values); the bounded retry loop in [`LifecycleEngine::get_collection_unique_id`]
//! is what reconciles them.

use netweave_core::{IdGenerator, ReservedId};
use netweave_store::{HandleStore, StoreError, TopologyStore};

use crate::audit::AuditLog;
use crate::engine::LifecycleEngine;
use crate::error::EngineError;

/// Retry budget for the issue-then-reserve loop before a pathological
/// ledger is reported as exhaustion.
const MAX_ID_ATTEMPTS: u32 = 1000;

/// Outcome of one entry in a bulk reservation; failures carry a message so
/// partial completion is visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveOutcome {
    pub value: String,
    pub reserved: bool,
    pub error: Option<String>,
}

impl ReserveOutcome {
    fn new(value: String, inserted: bool) -> Self {
        ReserveOutcome {
            reserved: inserted,
            error: (!inserted).then(|| format!("'{value}' already present in ledger")),
            value,
        }
    }
}

impl<H, T, A> LifecycleEngine<H, T, A>
where
    H: HandleStore,
    T: TopologyStore,
    A: AuditLog,
{
    /// Creates a named generator with its counter at 1.
    pub fn create_generator(
        &mut self,
        name: &str,
        prefix: Option<String>,
        suffix: Option<String>,
        zero_fill_width: Option<u32>,
        actor: &str,
    ) -> Result<IdGenerator, EngineError> {
        let generator = IdGenerator::new(name, prefix, suffix, zero_fill_width, actor);
        self.handles.create_generator(&generator)?;
        Ok(generator)
    }

    /// The id the next issuance will produce, without advancing the counter.
    pub fn next_id(&self, name: &str) -> Result<String, EngineError> {
        let generator =
            self.handles
                .get_generator(name)?
                .ok_or_else(|| EngineError::GeneratorNotFound {
                    name: name.to_string(),
                })?;
        Ok(generator.next_id())
    }

    /// Atomically formats the current counter, records it as `last_id`, and
    /// increments the counter.
    pub fn issue_sequential_id(&mut self, name: &str) -> Result<String, EngineError> {
        match self.handles.advance_generator(name) {
            Ok(issued) => Ok(issued),
            Err(StoreError::GeneratorNotFound { name }) => {
                Err(EngineError::GeneratorNotFound { name })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Issues ids until one is absent from the reservation ledger, records
    /// it there as in-use, and returns it.
    ///
    /// The ledger's uniqueness constraint is the final arbiter under
    /// concurrent writers; a collision discards the candidate and retries
    /// with the next issued id, up to a bounded attempt count.
    pub fn get_collection_unique_id(
        &mut self,
        generator: &str,
        collection: &str,
    ) -> Result<String, EngineError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.issue_sequential_id(generator)?;
            if self
                .handles
                .try_insert_reservation(collection, &ReservedId::taken(candidate.as_str()))?
            {
                return Ok(candidate);
            }
            tracing::debug!(%candidate, collection, "issued id already in ledger, retrying");
        }
        Err(EngineError::IdSpaceExhausted {
            generator: generator.to_string(),
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Registers a caller-supplied identifier as in-use.
    ///
    /// Returns `true` if a fresh ledger entry was created, `false` if an
    /// existing pre-reservation was claimed. A value already in active use
    /// fails with [`EngineError::DuplicateId`].
    pub fn register_unique_id(
        &mut self,
        collection: &str,
        value: &str,
    ) -> Result<bool, EngineError> {
        if self
            .handles
            .try_insert_reservation(collection, &ReservedId::taken(value))?
        {
            return Ok(true);
        }
        match self.handles.get_reservation(collection, value)? {
            Some(existing) if existing.reserved => {
                self.handles.claim_reservation(collection, value)?;
                Ok(false)
            }
            _ => Err(EngineError::DuplicateId {
                value: value.to_string(),
            }),
        }
    }

    /// Read-only probe: `true` if the identifier is absent from the ledger
    /// or only soft-reserved (claimable).
    pub fn is_free_unique_id(&self, collection: &str, value: &str) -> Result<bool, EngineError> {
        Ok(match self.handles.get_reservation(collection, value)? {
            None => true,
            Some(existing) => existing.reserved,
        })
    }

    /// Pre-materializes the formatted ids for a contiguous counter range as
    /// soft reservations, without touching the generator's counter.
    pub fn bulk_reserve_range(
        &mut self,
        generator: &str,
        collection: &str,
        start: i64,
        end: i64,
        message: &str,
        reserver: &str,
    ) -> Result<Vec<ReserveOutcome>, EngineError> {
        let template =
            self.handles
                .get_generator(generator)?
                .ok_or_else(|| EngineError::GeneratorNotFound {
                    name: generator.to_string(),
                })?;
        let mut outcomes = Vec::new();
        for counter in start..=end {
            let value = template.format(counter);
            let inserted = self.handles.try_insert_reservation(
                collection,
                &ReservedId::reservation(value.as_str(), message, reserver),
            )?;
            outcomes.push(ReserveOutcome::new(value, inserted));
        }
        Ok(outcomes)
    }

    /// Advances the counter `count` times, recording each issued id as a
    /// soft reservation. Entries report success/failure independently.
    pub fn reserve_id_sequence(
        &mut self,
        generator: &str,
        collection: &str,
        count: u32,
        message: &str,
        reserver: &str,
    ) -> Result<Vec<ReserveOutcome>, EngineError> {
        let mut outcomes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let value = self.issue_sequential_id(generator)?;
            let inserted = self.handles.try_insert_reservation(
                collection,
                &ReservedId::reservation(value.as_str(), message, reserver),
            )?;
            outcomes.push(ReserveOutcome::new(value, inserted));
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use netweave_store::{MemoryHandleStore, MemoryTopologyStore};

    type TestEngine = LifecycleEngine<MemoryHandleStore, MemoryTopologyStore, MemoryAuditLog>;

    fn engine() -> TestEngine {
        LifecycleEngine::new(
            MemoryHandleStore::new(),
            MemoryTopologyStore::new(),
            MemoryAuditLog::new(),
        )
    }

    fn nordunet_generator(engine: &mut TestEngine) {
        engine
            .create_generator("service_id", Some("NU-S".into()), None, Some(6), "admin")
            .unwrap();
    }

    #[test]
    fn issue_sequential_id_scenario() {
        let mut engine = engine();
        nordunet_generator(&mut engine);
        assert_eq!(engine.next_id("service_id").unwrap(), "NU-S000001");
        assert_eq!(
            engine.issue_sequential_id("service_id").unwrap(),
            "NU-S000001"
        );
        assert_eq!(
            engine.issue_sequential_id("service_id").unwrap(),
            "NU-S000002"
        );
        assert!(matches!(
            engine.issue_sequential_id("missing"),
            Err(EngineError::GeneratorNotFound { .. })
        ));
    }

    #[test]
    fn collection_unique_id_skips_preseeded_values() {
        let mut engine = engine();
        nordunet_generator(&mut engine);
        // A bulk import already claimed the first two counter values.
        engine
            .register_unique_id("nordunet", "NU-S000001")
            .unwrap();
        engine
            .register_unique_id("nordunet", "NU-S000002")
            .unwrap();

        let issued = engine
            .get_collection_unique_id("service_id", "nordunet")
            .unwrap();
        assert_eq!(issued, "NU-S000003");
        assert!(!engine.is_free_unique_id("nordunet", &issued).unwrap());
    }

    #[test]
    fn register_twice_is_duplicate() {
        let mut engine = engine();
        assert!(engine.register_unique_id("nordunet", "cable1").unwrap());
        assert!(matches!(
            engine.register_unique_id("nordunet", "cable1"),
            Err(EngineError::DuplicateId { .. })
        ));
    }

    #[test]
    fn register_claims_soft_reservation() {
        let mut engine = engine();
        nordunet_generator(&mut engine);
        engine
            .bulk_reserve_range("service_id", "nordunet", 100, 100, "import", "alice")
            .unwrap();
        assert!(engine.is_free_unique_id("nordunet", "NU-S000100").unwrap());

        // Claiming flips the entry to in-use rather than creating a new one.
        assert!(!engine.register_unique_id("nordunet", "NU-S000100").unwrap());
        assert!(!engine.is_free_unique_id("nordunet", "NU-S000100").unwrap());
    }

    #[test]
    fn bulk_reserve_range_leaves_counter_untouched() {
        let mut engine = engine();
        nordunet_generator(&mut engine);
        let outcomes = engine
            .bulk_reserve_range("service_id", "nordunet", 10, 12, "import", "alice")
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.reserved));
        assert_eq!(outcomes[0].value, "NU-S000010");
        assert_eq!(engine.next_id("service_id").unwrap(), "NU-S000001");

        // Re-reserving reports per-entry failure, not an error.
        let again = engine
            .bulk_reserve_range("service_id", "nordunet", 12, 13, "import", "alice")
            .unwrap();
        assert!(!again[0].reserved);
        assert!(again[0].error.is_some());
        assert!(again[1].reserved);
    }

    #[test]
    fn reserve_id_sequence_advances_counter() {
        let mut engine = engine();
        nordunet_generator(&mut engine);
        let outcomes = engine
            .reserve_id_sequence("service_id", "nordunet", 2, "maintenance", "alice")
            .unwrap();
        assert_eq!(outcomes[0].value, "NU-S000001");
        assert_eq!(outcomes[1].value, "NU-S000002");
        assert_eq!(engine.next_id("service_id").unwrap(), "NU-S000003");
    }

    #[test]
    fn exhaustion_is_bounded() {
        let mut engine = engine();
        engine
            .create_generator("flat", None, Some("-x".into()), None, "admin")
            .unwrap();
        // Pre-seed far past the retry budget so every candidate collides.
        for counter in 1..=2000 {
            engine
                .register_unique_id("nordunet", &format!("{counter}-x"))
                .unwrap();
        }
        assert!(matches!(
            engine.get_collection_unique_id("flat", "nordunet"),
            Err(EngineError::IdSpaceExhausted { .. })
        ));
    }
}
