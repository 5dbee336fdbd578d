//! Storage backends for the netweave inventory core.
//!
//! Two independent storage contracts mirror the split data model:
//!
//! - [`HandleStore`](traits::HandleStore) -- the relational side: entity
//!   handles, type definitions, id generators, the reservation ledger, and
//!   the append-only activity log.
//! - [`TopologyStore`](traits::TopologyStore) -- the graph side: one node
//!   per entity and typed directed edges between them.
//!
//! Each contract has an in-memory backend (tests, ephemeral sessions) and a
//! SQLite backend (WAL mode, migrations, JSON TEXT columns). Backends are
//! fully swappable; the lifecycle engine only sees the traits.

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use memory::{MemoryHandleStore, MemoryTopologyStore};
pub use sqlite::{SqliteHandleStore, SqliteTopologyStore};
pub use traits::{HandleStore, TopologyStore};
