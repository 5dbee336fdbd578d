//! The [`HandleStore`] and [`TopologyStore`] traits defining the storage
//! contracts for the split data model.
//!
//! The two stores are independently transactional resources; the lifecycle
//! engine sequences writes across them and compensates on partial failure.
//! Methods are low-level CRUD -- each call is one atomic storage operation.
//! Both traits are synchronous: the engine runs one logical operation per
//! caller, with no internal background workers.

use netweave_core::{
    ActivityRecord, EdgeId, EntityHandle, GraphEdge, GraphNode, HandleId, IdGenerator, MetaType,
    NewHandle, PropertyMap, RelationType, ReservedId, TypeDefinition,
};

use crate::error::StoreError;

/// The relational side: entity handles, type definitions, id generators,
/// the reservation ledger, and the append-only activity log.
pub trait HandleStore {
    // -------------------------------------------------------------------
    // Type definitions
    // -------------------------------------------------------------------

    /// Inserts or replaces a type definition keyed by slug.
    fn upsert_type_definition(&mut self, def: &TypeDefinition) -> Result<(), StoreError>;

    /// Looks a type definition up by slug.
    fn get_type_definition(&self, slug: &str) -> Result<Option<TypeDefinition>, StoreError>;

    /// Lists all type definitions, ordered by slug.
    fn list_type_definitions(&self) -> Result<Vec<TypeDefinition>, StoreError>;

    /// Deletes a type definition. Returns `false` if no such slug existed.
    ///
    /// Cascading deletion of the type's handles is the engine's job, so the
    /// node pairing and audit contract are honored per entity.
    fn delete_type_definition(&mut self, slug: &str) -> Result<bool, StoreError>;

    // -------------------------------------------------------------------
    // Entity handles
    // -------------------------------------------------------------------

    /// Inserts a new handle row, assigning its primary key and timestamps.
    fn insert_handle(&mut self, new: &NewHandle) -> Result<EntityHandle, StoreError>;

    /// Retrieves a handle by id.
    fn get_handle(&self, id: HandleId) -> Result<Option<EntityHandle>, StoreError>;

    /// Finds the handle with the given display name and type, if any.
    fn find_handle(
        &self,
        display_name: &str,
        type_slug: &str,
    ) -> Result<Option<EntityHandle>, StoreError>;

    /// Lists all handles of a declared type, ordered by id.
    fn list_handles_by_type(&self, type_slug: &str) -> Result<Vec<EntityHandle>, StoreError>;

    /// Persists mutable handle fields (display name, meta-type, modifier,
    /// modified-at) for an existing row.
    fn update_handle(&mut self, handle: &EntityHandle) -> Result<(), StoreError>;

    /// Deletes a handle row. Returns `false` if it was already gone.
    fn delete_handle(&mut self, id: HandleId) -> Result<bool, StoreError>;

    // -------------------------------------------------------------------
    // Id generators
    // -------------------------------------------------------------------

    /// Creates a named generator. Fails with [`StoreError::DuplicateGenerator`]
    /// if the name is taken.
    fn create_generator(&mut self, generator: &IdGenerator) -> Result<(), StoreError>;

    /// Retrieves a generator by name.
    fn get_generator(&self, name: &str) -> Result<Option<IdGenerator>, StoreError>;

    /// Atomically formats the current counter, records it as `last_id`, and
    /// increments the counter. Returns the issued formatted id.
    ///
    /// Two concurrent callers must never observe the same counter value;
    /// backends serialize this per generator name (exclusive access for the
    /// in-memory backend, a write transaction for SQLite).
    fn advance_generator(&mut self, name: &str) -> Result<String, StoreError>;

    // -------------------------------------------------------------------
    // Reservation ledger
    // -------------------------------------------------------------------

    /// Attempts to insert a ledger entry. Returns `false` if the value is
    /// already present in the collection -- the uniqueness constraint is the
    /// final arbiter under concurrent writers.
    fn try_insert_reservation(
        &mut self,
        collection: &str,
        record: &ReservedId,
    ) -> Result<bool, StoreError>;

    /// Retrieves a ledger entry by value.
    fn get_reservation(
        &self,
        collection: &str,
        value: &str,
    ) -> Result<Option<ReservedId>, StoreError>;

    /// Flips an existing entry to `reserved = false`, claiming a
    /// pre-reservation for active use.
    fn claim_reservation(&mut self, collection: &str, value: &str) -> Result<(), StoreError>;

    // -------------------------------------------------------------------
    // Activity log
    // -------------------------------------------------------------------

    /// Appends one immutable activity record.
    fn append_activity(&mut self, record: &ActivityRecord) -> Result<(), StoreError>;

    /// Lists activity records for a subject entity, oldest first.
    fn list_activity(&self, subject: HandleId) -> Result<Vec<ActivityRecord>, StoreError>;
}

/// The graph side: one node per entity and typed directed edges.
pub trait TopologyStore {
    /// Creates a node. Fails with [`StoreError::DuplicateNode`] if a node
    /// with this id already exists.
    fn create_node(&mut self, node: &GraphNode) -> Result<(), StoreError>;

    /// Retrieves a node by its shared handle id.
    fn get_node(&self, id: HandleId) -> Result<Option<GraphNode>, StoreError>;

    /// Replaces a node's name, classification, and property bag.
    fn update_node(&mut self, node: &GraphNode) -> Result<(), StoreError>;

    /// Deletes a node and every edge touching it. Idempotent: deleting an
    /// absent node is not an error; returns whether a node was removed.
    fn delete_node(&mut self, id: HandleId) -> Result<bool, StoreError>;

    /// Creates a typed directed edge. Fails with [`StoreError::DanglingEdge`]
    /// if either endpoint is missing.
    fn create_edge(
        &mut self,
        relation: RelationType,
        from: HandleId,
        to: HandleId,
        properties: PropertyMap,
    ) -> Result<EdgeId, StoreError>;

    /// Retrieves an edge with its endpoints, if present.
    fn get_edge(&self, id: EdgeId) -> Result<Option<(HandleId, HandleId, GraphEdge)>, StoreError>;

    /// Deletes an edge. Idempotent; returns whether an edge was removed.
    fn delete_edge(&mut self, id: EdgeId) -> Result<bool, StoreError>;

    /// Lists outgoing edges of a node, optionally filtered by relationship
    /// type, as `(edge id, target id, edge)` triples ordered by edge id.
    fn outgoing_edges(
        &self,
        from: HandleId,
        relation: Option<RelationType>,
    ) -> Result<Vec<(EdgeId, HandleId, GraphEdge)>, StoreError>;

    /// Lists the ids of edges running `from -> to`, optionally filtered by
    /// relationship type. Used for the at-most-one-edge dedup check.
    fn edges_between(
        &self,
        from: HandleId,
        to: HandleId,
        relation: Option<RelationType>,
    ) -> Result<Vec<EdgeId>, StoreError>;

    /// Reads a node's classification without materializing the property bag.
    fn node_meta_type(&self, id: HandleId) -> Result<Option<MetaType>, StoreError>;
}
