//! In-memory implementations of [`HandleStore`] and [`TopologyStore`].
//!
//! First-class backends for tests and ephemeral sessions, with identical
//! semantics to the SQLite backends. The relational side lives in HashMaps;
//! the topology side is a petgraph `StableDiGraph` so node removal keeps
//! the remaining indices stable.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use netweave_core::time::now_millis;
use netweave_core::{
    ActivityRecord, EdgeId, EntityHandle, GraphEdge, GraphNode, HandleId, IdGenerator, MetaType,
    NewHandle, PropertyMap, RelationType, ReservedId, TypeDefinition,
};

use crate::error::StoreError;
use crate::traits::{HandleStore, TopologyStore};

// ---------------------------------------------------------------------------
// Relational side
// ---------------------------------------------------------------------------

/// In-memory implementation of [`HandleStore`].
#[derive(Debug, Default)]
pub struct MemoryHandleStore {
    types: HashMap<String, TypeDefinition>,
    handles: HashMap<HandleId, EntityHandle>,
    next_handle_id: i64,
    generators: HashMap<String, IdGenerator>,
    /// Reservation ledger keyed by (collection, value).
    reservations: HashMap<(String, String), ReservedId>,
    activity: Vec<ActivityRecord>,
}

impl MemoryHandleStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        MemoryHandleStore {
            next_handle_id: 1,
            ..Default::default()
        }
    }
}

impl HandleStore for MemoryHandleStore {
    fn upsert_type_definition(&mut self, def: &TypeDefinition) -> Result<(), StoreError> {
        self.types.insert(def.slug.clone(), def.clone());
        Ok(())
    }

    fn get_type_definition(&self, slug: &str) -> Result<Option<TypeDefinition>, StoreError> {
        Ok(self.types.get(slug).cloned())
    }

    fn list_type_definitions(&self) -> Result<Vec<TypeDefinition>, StoreError> {
        let mut defs: Vec<TypeDefinition> = self.types.values().cloned().collect();
        defs.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(defs)
    }

    fn delete_type_definition(&mut self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.types.remove(slug).is_some())
    }

    fn insert_handle(&mut self, new: &NewHandle) -> Result<EntityHandle, StoreError> {
        let id = HandleId(self.next_handle_id);
        self.next_handle_id += 1;
        let now = now_millis();
        let handle = EntityHandle {
            id,
            display_name: new.display_name.clone(),
            type_slug: new.type_slug.clone(),
            meta_type: new.meta_type,
            creator: new.actor.clone(),
            created_at: now,
            modifier: new.actor.clone(),
            modified_at: now,
        };
        self.handles.insert(id, handle.clone());
        Ok(handle)
    }

    fn get_handle(&self, id: HandleId) -> Result<Option<EntityHandle>, StoreError> {
        Ok(self.handles.get(&id).cloned())
    }

    fn find_handle(
        &self,
        display_name: &str,
        type_slug: &str,
    ) -> Result<Option<EntityHandle>, StoreError> {
        let mut hits: Vec<&EntityHandle> = self
            .handles
            .values()
            .filter(|h| h.display_name == display_name && h.type_slug == type_slug)
            .collect();
        hits.sort_by_key(|h| h.id);
        Ok(hits.first().map(|h| (*h).clone()))
    }

    fn list_handles_by_type(&self, type_slug: &str) -> Result<Vec<EntityHandle>, StoreError> {
        let mut hits: Vec<EntityHandle> = self
            .handles
            .values()
            .filter(|h| h.type_slug == type_slug)
            .cloned()
            .collect();
        hits.sort_by_key(|h| h.id);
        Ok(hits)
    }

    fn update_handle(&mut self, handle: &EntityHandle) -> Result<(), StoreError> {
        if !self.handles.contains_key(&handle.id) {
            return Err(StoreError::HandleNotFound { id: handle.id });
        }
        self.handles.insert(handle.id, handle.clone());
        Ok(())
    }

    fn delete_handle(&mut self, id: HandleId) -> Result<bool, StoreError> {
        Ok(self.handles.remove(&id).is_some())
    }

    fn create_generator(&mut self, generator: &IdGenerator) -> Result<(), StoreError> {
        if self.generators.contains_key(&generator.name) {
            return Err(StoreError::DuplicateGenerator {
                name: generator.name.clone(),
            });
        }
        self.generators
            .insert(generator.name.clone(), generator.clone());
        Ok(())
    }

    fn get_generator(&self, name: &str) -> Result<Option<IdGenerator>, StoreError> {
        Ok(self.generators.get(name).cloned())
    }

    fn advance_generator(&mut self, name: &str) -> Result<String, StoreError> {
        let generator =
            self.generators
                .get_mut(name)
                .ok_or_else(|| StoreError::GeneratorNotFound {
                    name: name.to_string(),
                })?;
        let issued = generator.format(generator.base_counter);
        generator.last_id = Some(issued.clone());
        generator.base_counter += 1;
        generator.modified_at = now_millis();
        Ok(issued)
    }

    fn try_insert_reservation(
        &mut self,
        collection: &str,
        record: &ReservedId,
    ) -> Result<bool, StoreError> {
        let key = (collection.to_string(), record.value.clone());
        if self.reservations.contains_key(&key) {
            return Ok(false);
        }
        self.reservations.insert(key, record.clone());
        Ok(true)
    }

    fn get_reservation(
        &self,
        collection: &str,
        value: &str,
    ) -> Result<Option<ReservedId>, StoreError> {
        Ok(self
            .reservations
            .get(&(collection.to_string(), value.to_string()))
            .cloned())
    }

    fn claim_reservation(&mut self, collection: &str, value: &str) -> Result<(), StoreError> {
        let entry = self
            .reservations
            .get_mut(&(collection.to_string(), value.to_string()))
            .ok_or_else(|| StoreError::Integrity {
                reason: format!("no reservation '{}' in collection '{}'", value, collection),
            })?;
        entry.reserved = false;
        Ok(())
    }

    fn append_activity(&mut self, record: &ActivityRecord) -> Result<(), StoreError> {
        self.activity.push(record.clone());
        Ok(())
    }

    fn list_activity(&self, subject: HandleId) -> Result<Vec<ActivityRecord>, StoreError> {
        Ok(self
            .activity
            .iter()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Graph side
// ---------------------------------------------------------------------------

/// Edge weight: the store-assigned id travels with the edge payload.
#[derive(Debug, Clone)]
struct StoredEdge {
    id: EdgeId,
    edge: GraphEdge,
}

/// In-memory implementation of [`TopologyStore`], backed by a petgraph
/// `StableDiGraph` so removals never invalidate surviving indices.
#[derive(Debug, Default)]
pub struct MemoryTopologyStore {
    graph: StableDiGraph<GraphNode, StoredEdge>,
    node_indices: HashMap<HandleId, NodeIndex>,
    edge_indices: HashMap<EdgeId, EdgeIndex>,
    next_edge_id: i64,
}

impl MemoryTopologyStore {
    /// Creates a new empty topology.
    pub fn new() -> Self {
        MemoryTopologyStore {
            next_edge_id: 1,
            ..Default::default()
        }
    }

    fn index_of(&self, id: HandleId) -> Option<NodeIndex> {
        self.node_indices.get(&id).copied()
    }
}

impl TopologyStore for MemoryTopologyStore {
    fn create_node(&mut self, node: &GraphNode) -> Result<(), StoreError> {
        if self.node_indices.contains_key(&node.id) {
            return Err(StoreError::DuplicateNode { id: node.id });
        }
        let idx = self.graph.add_node(node.clone());
        self.node_indices.insert(node.id, idx);
        Ok(())
    }

    fn get_node(&self, id: HandleId) -> Result<Option<GraphNode>, StoreError> {
        Ok(self
            .index_of(id)
            .and_then(|idx| self.graph.node_weight(idx))
            .cloned())
    }

    fn update_node(&mut self, node: &GraphNode) -> Result<(), StoreError> {
        let idx = self
            .index_of(node.id)
            .ok_or(StoreError::NodeNotFound { id: node.id })?;
        if let Some(weight) = self.graph.node_weight_mut(idx) {
            *weight = node.clone();
        }
        Ok(())
    }

    fn delete_node(&mut self, id: HandleId) -> Result<bool, StoreError> {
        let Some(idx) = self.node_indices.remove(&id) else {
            return Ok(false);
        };
        // Drop index-map entries for every edge petgraph will remove with
        // the node.
        let touching: Vec<EdgeId> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|edge_ref| edge_ref.weight().id)
            .collect();
        for edge_id in touching {
            self.edge_indices.remove(&edge_id);
        }
        self.graph.remove_node(idx);
        Ok(true)
    }

    fn create_edge(
        &mut self,
        relation: RelationType,
        from: HandleId,
        to: HandleId,
        properties: PropertyMap,
    ) -> Result<EdgeId, StoreError> {
        let (Some(from_idx), Some(to_idx)) = (self.index_of(from), self.index_of(to)) else {
            return Err(StoreError::DanglingEdge { from, to });
        };
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        let weight = StoredEdge {
            id,
            edge: GraphEdge {
                relation,
                properties,
            },
        };
        let idx = self.graph.add_edge(from_idx, to_idx, weight);
        self.edge_indices.insert(id, idx);
        Ok(id)
    }

    fn get_edge(&self, id: EdgeId) -> Result<Option<(HandleId, HandleId, GraphEdge)>, StoreError> {
        let Some(&idx) = self.edge_indices.get(&id) else {
            return Ok(None);
        };
        let Some((from_idx, to_idx)) = self.graph.edge_endpoints(idx) else {
            return Ok(None);
        };
        let edge = match self.graph.edge_weight(idx) {
            Some(weight) => weight.edge.clone(),
            None => return Ok(None),
        };
        let from = self.graph[from_idx].id;
        let to = self.graph[to_idx].id;
        Ok(Some((from, to, edge)))
    }

    fn delete_edge(&mut self, id: EdgeId) -> Result<bool, StoreError> {
        let Some(idx) = self.edge_indices.remove(&id) else {
            return Ok(false);
        };
        self.graph.remove_edge(idx);
        Ok(true)
    }

    fn outgoing_edges(
        &self,
        from: HandleId,
        relation: Option<RelationType>,
    ) -> Result<Vec<(EdgeId, HandleId, GraphEdge)>, StoreError> {
        let Some(idx) = self.index_of(from) else {
            return Ok(Vec::new());
        };
        let mut edges: Vec<(EdgeId, HandleId, GraphEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|edge_ref| relation.is_none_or(|r| edge_ref.weight().edge.relation == r))
            .map(|edge_ref| {
                let weight = edge_ref.weight();
                let target = self.graph[edge_ref.target()].id;
                (weight.id, target, weight.edge.clone())
            })
            .collect();
        edges.sort_by_key(|(edge_id, _, _)| *edge_id);
        Ok(edges)
    }

    fn edges_between(
        &self,
        from: HandleId,
        to: HandleId,
        relation: Option<RelationType>,
    ) -> Result<Vec<EdgeId>, StoreError> {
        let (Some(from_idx), Some(to_idx)) = (self.index_of(from), self.index_of(to)) else {
            return Ok(Vec::new());
        };
        let mut ids: Vec<EdgeId> = self
            .graph
            .edges_connecting(from_idx, to_idx)
            .filter(|edge_ref| relation.is_none_or(|r| edge_ref.weight().edge.relation == r))
            .map(|edge_ref| edge_ref.weight().id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn node_meta_type(&self, id: HandleId) -> Result<Option<MetaType>, StoreError> {
        Ok(self
            .index_of(id)
            .and_then(|idx| self.graph.node_weight(idx))
            .map(|node| node.meta_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netweave_core::MetaType;

    fn new_handle(name: &str, slug: &str, meta: MetaType) -> NewHandle {
        NewHandle {
            display_name: name.to_string(),
            type_slug: slug.to_string(),
            meta_type: meta,
            actor: "tester".to_string(),
        }
    }

    #[test]
    fn handle_crud_assigns_increasing_ids() {
        let mut store = MemoryHandleStore::new();
        let a = store
            .insert_handle(&new_handle("r1", "router", MetaType::Physical))
            .unwrap();
        let b = store
            .insert_handle(&new_handle("r2", "router", MetaType::Physical))
            .unwrap();
        assert!(b.id > a.id);

        let found = store.find_handle("r1", "router").unwrap().unwrap();
        assert_eq!(found.id, a.id);
        assert_eq!(store.list_handles_by_type("router").unwrap().len(), 2);

        assert!(store.delete_handle(a.id).unwrap());
        assert!(!store.delete_handle(a.id).unwrap());
        assert!(store.get_handle(a.id).unwrap().is_none());
    }

    #[test]
    fn update_handle_requires_existing_row() {
        let mut store = MemoryHandleStore::new();
        let mut handle = store
            .insert_handle(&new_handle("r1", "router", MetaType::Physical))
            .unwrap();
        handle.display_name = "r1.example.net".to_string();
        store.update_handle(&handle).unwrap();
        assert_eq!(
            store.get_handle(handle.id).unwrap().unwrap().display_name,
            "r1.example.net"
        );

        let ghost = EntityHandle {
            id: HandleId(999),
            ..handle
        };
        assert!(matches!(
            store.update_handle(&ghost),
            Err(StoreError::HandleNotFound { .. })
        ));
    }

    #[test]
    fn advance_generator_issues_and_increments() {
        let mut store = MemoryHandleStore::new();
        let generator = IdGenerator::new(
            "service_id",
            Some("NU-S".to_string()),
            None,
            Some(6),
            "admin",
        );
        store.create_generator(&generator).unwrap();

        assert_eq!(store.advance_generator("service_id").unwrap(), "NU-S000001");
        assert_eq!(store.advance_generator("service_id").unwrap(), "NU-S000002");

        let stored = store.get_generator("service_id").unwrap().unwrap();
        assert_eq!(stored.base_counter, 3);
        assert_eq!(stored.last_id.as_deref(), Some("NU-S000002"));

        assert!(matches!(
            store.advance_generator("missing"),
            Err(StoreError::GeneratorNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_generator_name_rejected() {
        let mut store = MemoryHandleStore::new();
        let generator = IdGenerator::new("gen", None, None, None, "admin");
        store.create_generator(&generator).unwrap();
        assert!(matches!(
            store.create_generator(&generator),
            Err(StoreError::DuplicateGenerator { .. })
        ));
    }

    #[test]
    fn reservation_ledger_is_unique_per_collection() {
        let mut store = MemoryHandleStore::new();
        let entry = ReservedId::taken("cable1");
        assert!(store.try_insert_reservation("nordunet", &entry).unwrap());
        assert!(!store.try_insert_reservation("nordunet", &entry).unwrap());
        // Same value in another collection is unrelated.
        assert!(store.try_insert_reservation("sunet", &entry).unwrap());
    }

    #[test]
    fn claim_reservation_flips_flag() {
        let mut store = MemoryHandleStore::new();
        let entry = ReservedId::reservation("NU-S000100", "import", "alice");
        store.try_insert_reservation("nordunet", &entry).unwrap();
        store.claim_reservation("nordunet", "NU-S000100").unwrap();
        let stored = store
            .get_reservation("nordunet", "NU-S000100")
            .unwrap()
            .unwrap();
        assert!(!stored.reserved);
    }

    #[test]
    fn topology_node_and_edge_lifecycle() {
        let mut topo = MemoryTopologyStore::new();
        topo.create_node(&GraphNode::new(HandleId(1), "r1", MetaType::Physical))
            .unwrap();
        topo.create_node(&GraphNode::new(HandleId(2), "site-a", MetaType::Location))
            .unwrap();

        assert!(matches!(
            topo.create_node(&GraphNode::new(HandleId(1), "dup", MetaType::Physical)),
            Err(StoreError::DuplicateNode { .. })
        ));

        let edge_id = topo
            .create_edge(
                RelationType::LocatedIn,
                HandleId(1),
                HandleId(2),
                PropertyMap::new(),
            )
            .unwrap();
        let (from, to, edge) = topo.get_edge(edge_id).unwrap().unwrap();
        assert_eq!((from, to), (HandleId(1), HandleId(2)));
        assert_eq!(edge.relation, RelationType::LocatedIn);

        let outgoing = topo
            .outgoing_edges(HandleId(1), Some(RelationType::LocatedIn))
            .unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].1, HandleId(2));

        assert_eq!(
            topo.edges_between(HandleId(1), HandleId(2), Some(RelationType::LocatedIn))
                .unwrap(),
            vec![edge_id]
        );
        // Direction matters.
        assert!(topo
            .edges_between(HandleId(2), HandleId(1), Some(RelationType::LocatedIn))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn delete_node_is_idempotent_and_drops_edges() {
        let mut topo = MemoryTopologyStore::new();
        topo.create_node(&GraphNode::new(HandleId(1), "a", MetaType::Physical))
            .unwrap();
        topo.create_node(&GraphNode::new(HandleId(2), "b", MetaType::Physical))
            .unwrap();
        let edge_id = topo
            .create_edge(
                RelationType::Has,
                HandleId(1),
                HandleId(2),
                PropertyMap::new(),
            )
            .unwrap();

        assert!(topo.delete_node(HandleId(2)).unwrap());
        assert!(!topo.delete_node(HandleId(2)).unwrap());
        assert!(topo.get_edge(edge_id).unwrap().is_none());
        assert!(topo.outgoing_edges(HandleId(1), None).unwrap().is_empty());
    }

    #[test]
    fn dangling_edge_rejected() {
        let mut topo = MemoryTopologyStore::new();
        topo.create_node(&GraphNode::new(HandleId(1), "a", MetaType::Physical))
            .unwrap();
        assert!(matches!(
            topo.create_edge(
                RelationType::Has,
                HandleId(1),
                HandleId(99),
                PropertyMap::new()
            ),
            Err(StoreError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn edge_ids_are_not_reused_after_removal() {
        let mut topo = MemoryTopologyStore::new();
        topo.create_node(&GraphNode::new(HandleId(1), "a", MetaType::Physical))
            .unwrap();
        topo.create_node(&GraphNode::new(HandleId(2), "b", MetaType::Physical))
            .unwrap();
        let first = topo
            .create_edge(
                RelationType::Has,
                HandleId(1),
                HandleId(2),
                PropertyMap::new(),
            )
            .unwrap();
        topo.delete_edge(first).unwrap();
        let second = topo
            .create_edge(
                RelationType::ConnectedTo,
                HandleId(1),
                HandleId(2),
                PropertyMap::new(),
            )
            .unwrap();
        assert_ne!(first, second);
        assert!(topo.get_edge(first).unwrap().is_none());
    }
}
