//! The audit emission contract and its implementations.
//!
//! The engine calls [`AuditLog::emit`] exactly once per successful mutating
//! step -- never on failed or no-op steps. Emission is a best-effort side
//! channel: it must not block or fail the outer operation, so the trait is
//! infallible and implementations swallow (but log) their own errors.

use netweave_core::ActivityRecord;
use netweave_store::HandleStore;

/// Sink for activity records.
pub trait AuditLog {
    /// Reports one successful mutation. Must never fail the caller.
    fn emit(&mut self, record: ActivityRecord);
}

/// Emits activity records as structured tracing events.
#[derive(Debug, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn emit(&mut self, record: ActivityRecord) {
        tracing::info!(
            actor = %record.actor,
            verb = record.verb.as_str(),
            subject = %record.subject,
            related = ?record.related,
            payload = ?record.payload,
            "activity"
        );
    }
}

/// Records activity in memory; used by tests to assert on emitted records.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Vec<ActivityRecord>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        MemoryAuditLog::default()
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }
}

impl AuditLog for MemoryAuditLog {
    fn emit(&mut self, record: ActivityRecord) {
        self.records.push(record);
    }
}

/// Persists activity records through a [`HandleStore`]'s append-only log.
///
/// Owns its own store instance (typically a separate connection to the same
/// database) so audit writes never contend with the engine's own handle
/// store borrow.
pub struct StoreAuditLog<S: HandleStore> {
    store: S,
}

impl<S: HandleStore> StoreAuditLog<S> {
    pub fn new(store: S) -> Self {
        StoreAuditLog { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: HandleStore> AuditLog for StoreAuditLog<S> {
    fn emit(&mut self, record: ActivityRecord) {
        if let Err(e) = self.store.append_activity(&record) {
            tracing::warn!(error = %e, "dropping activity record");
        }
    }
}
