//! Property tests for identifier issuance.

use proptest::prelude::*;

use netweave_engine::{LifecycleEngine, MemoryAuditLog};
use netweave_store::{HandleStore, MemoryHandleStore, MemoryTopologyStore};

type TestEngine = LifecycleEngine<MemoryHandleStore, MemoryTopologyStore, MemoryAuditLog>;

fn engine() -> TestEngine {
    LifecycleEngine::new(
        MemoryHandleStore::new(),
        MemoryTopologyStore::new(),
        MemoryAuditLog::new(),
    )
}

proptest! {
    /// Issued ids are pairwise distinct and follow counter order.
    #[test]
    fn issued_ids_are_distinct_and_ordered(
        prefix in "[A-Z]{0,4}",
        suffix in "[a-z-]{0,3}",
        width in proptest::option::of(1u32..8),
        count in 1usize..60,
    ) {
        let mut engine = engine();
        engine
            .create_generator("gen", Some(prefix.clone()), Some(suffix.clone()), width, "admin")
            .unwrap();

        let mut issued = Vec::with_capacity(count);
        for _ in 0..count {
            issued.push(engine.issue_sequential_id("gen").unwrap());
        }

        for (index, value) in issued.iter().enumerate() {
            let counter = index as i64 + 1;
            let digits = match width {
                Some(w) => format!("{:0>width$}", counter, width = w as usize),
                None => counter.to_string(),
            };
            prop_assert_eq!(value, &format!("{prefix}{digits}{suffix}"));
        }

        let mut unique = issued.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), issued.len());
    }

    /// The ledger never hands out a value it already holds as in-use,
    /// regardless of how it was pre-seeded with future counter values.
    #[test]
    fn collection_unique_ids_never_collide_with_ledger(
        seeds in proptest::collection::hash_set(1i64..40, 0..10),
        count in 1usize..20,
    ) {
        let mut engine = engine();
        engine
            .create_generator("gen", Some("ID-".into()), None, Some(4), "admin")
            .unwrap();
        let template = engine.handles().get_generator("gen").unwrap().unwrap();
        for seed in &seeds {
            engine.register_unique_id("pool", &template.format(*seed)).unwrap();
        }

        let mut returned = Vec::new();
        for _ in 0..count {
            let value = engine.get_collection_unique_id("gen", "pool").unwrap();
            prop_assert!(!seeds.iter().any(|s| template.format(*s) == value));
            returned.push(value);
        }
        let mut unique = returned.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), returned.len());
    }
}
