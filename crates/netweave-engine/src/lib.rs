//! The consistency and lifecycle engine for the netweave inventory.
//!
//! Orchestrates the entity-handle/graph-node pairing across the two storage
//! contracts of `netweave-store`: creation with compensating rollback,
//! role-scoped cascading deletion, the Logical<->Physical meta-type
//! transition state machine, relationship assignment with auto-conversion
//! and dedup, unique-identifier issuance against a reservation ledger, and
//! the audit emission contract.

pub mod audit;
pub mod engine;
pub mod error;
pub mod ids;
pub mod relations;

pub use audit::{AuditLog, MemoryAuditLog, StoreAuditLog, TracingAuditLog};
pub use engine::LifecycleEngine;
pub use error::EngineError;
pub use ids::ReserveOutcome;
pub use relations::RelationOutcome;
