//! The consistency/lifecycle engine: entity creation, cascading deletion,
//! property updates, relationship deletion, and type-definition management.
//!
//! The engine owns no storage of its own. It sequences writes across the two
//! independently transactional stores and applies compensating actions on
//! partial failure, preserving the invariant that an entity handle exists
//! iff its paired graph node exists. Every successful mutating step emits
//! exactly one activity record.

use std::collections::HashSet;

use serde_json::Value;

use netweave_core::{
    ActivityPayload, ActivityRecord, EdgeId, EntityHandle, GraphNode, HandleId, MetaType,
    NewHandle, PropertyMap, RelationType, TypeDefinition, Verb,
};
use netweave_store::{HandleStore, StoreError, TopologyStore};

use crate::audit::AuditLog;
use crate::error::EngineError;

/// Orchestrates the handle/node pairing across a [`HandleStore`], a
/// [`TopologyStore`], and an [`AuditLog`].
///
/// One logical operation runs per `&mut self` call; the engine has no
/// internal background workers and no internal locking. Cancellation and
/// timeouts are the caller's responsibility.
pub struct LifecycleEngine<H, T, A> {
    pub(crate) handles: H,
    pub(crate) topology: T,
    pub(crate) audit: A,
}

impl<H, T, A> LifecycleEngine<H, T, A>
where
    H: HandleStore,
    T: TopologyStore,
    A: AuditLog,
{
    /// Builds an engine over explicit store handles. Store lifecycle
    /// (open/close) belongs to the process bootstrap, not to the engine.
    pub fn new(handles: H, topology: T, audit: A) -> Self {
        LifecycleEngine {
            handles,
            topology,
            audit,
        }
    }

    /// Read access to the relational store.
    pub fn handles(&self) -> &H {
        &self.handles
    }

    /// Read access to the topology store.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Read access to the audit sink.
    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// Tears the engine apart into its stores.
    pub fn into_parts(self) -> (H, T, A) {
        (self.handles, self.topology, self.audit)
    }

    // -------------------------------------------------------------------
    // Entity lifecycle
    // -------------------------------------------------------------------

    /// Creates an entity: a handle row plus the paired graph node, under the
    /// generic policy (no uniqueness check beyond the primary key).
    ///
    /// If node creation fails after the row is committed, the row is rolled
    /// back; if that rollback also fails, the detected inconsistency is
    /// surfaced as [`EngineError::ConsistencyViolation`].
    pub fn create_entity(
        &mut self,
        display_name: &str,
        type_slug: &str,
        meta_type: MetaType,
        actor: &str,
    ) -> Result<EntityHandle, EngineError> {
        self.resolve_type_definition(type_slug)?;
        let new = NewHandle {
            display_name: display_name.to_string(),
            type_slug: type_slug.to_string(),
            meta_type,
            actor: actor.to_string(),
        };
        let handle = self.handles.insert_handle(&new)?;
        let node = GraphNode::new(handle.id, display_name, meta_type);
        match self.topology.create_node(&node) {
            Ok(()) => {}
            Err(StoreError::DuplicateNode { .. }) => {
                // Drifted stores left a node behind; adopt and refresh it.
                tracing::warn!(id = %handle.id, "adopting pre-existing node for new handle");
                self.topology.update_node(&node)?;
            }
            Err(e) => {
                tracing::warn!(id = %handle.id, error = %e, "node creation failed, rolling back handle row");
                if let Err(rollback) = self.handles.delete_handle(handle.id) {
                    return Err(EngineError::ConsistencyViolation {
                        reason: format!(
                            "node creation failed ({e}) and handle rollback failed ({rollback})"
                        ),
                    });
                }
                return Err(e.into());
            }
        }
        tracing::info!(id = %handle.id, name = display_name, %meta_type, "entity created");
        self.audit.emit(ActivityRecord::new(
            actor,
            Verb::Create,
            handle.id,
            None,
            ActivityPayload::Entity {
                object_name: handle.describe(),
            },
        ));
        Ok(handle)
    }

    /// Creates an entity under the unique policy: fails with
    /// [`EngineError::DuplicateEntity`] -- without any write -- if a handle
    /// with the same `(display_name, type_slug)` already exists.
    pub fn create_unique_entity(
        &mut self,
        display_name: &str,
        type_slug: &str,
        meta_type: MetaType,
        actor: &str,
    ) -> Result<EntityHandle, EngineError> {
        if let Some(existing) = self.handles.find_handle(display_name, type_slug)? {
            return Err(EngineError::DuplicateEntity {
                existing: existing.id,
            });
        }
        self.create_entity(display_name, type_slug, meta_type, actor)
    }

    /// Deletes an entity, cascading by role:
    ///
    /// - `Physical`: descendants via outgoing `Has`, then `Part_of`, first.
    /// - `Location`: descendants via outgoing `Has` only.
    /// - otherwise: no cascade.
    ///
    /// Node deletion is idempotent (an already-absent node is success).
    /// Returns whether a handle row was actually removed.
    pub fn delete_entity(&mut self, id: HandleId, actor: &str) -> Result<bool, EngineError> {
        if self.handles.get_handle(id)?.is_none() {
            // No handle: clear any orphaned node and report nothing deleted.
            self.topology.delete_node(id)?;
            return Ok(false);
        }
        let mut visited = HashSet::new();
        self.delete_recursive(id, actor, &mut visited)?;
        tracing::info!(%id, descendants = visited.len() - 1, "entity deleted");
        Ok(true)
    }

    fn delete_recursive(
        &mut self,
        id: HandleId,
        actor: &str,
        visited: &mut HashSet<HandleId>,
    ) -> Result<(), EngineError> {
        // Cycle guard: a revisited id is already being deleted upstack.
        if !visited.insert(id) {
            return Ok(());
        }
        let handle = self.handles.get_handle(id)?;
        let cascade: &[RelationType] = match handle.as_ref().map(|h| h.meta_type) {
            Some(MetaType::Physical) => &[RelationType::Has, RelationType::PartOf],
            Some(MetaType::Location) => &[RelationType::Has],
            _ => &[],
        };
        for relation in cascade {
            let children: Vec<HandleId> = self
                .topology
                .outgoing_edges(id, Some(*relation))?
                .into_iter()
                .map(|(_, target, _)| target)
                .collect();
            for child in children {
                self.delete_recursive(child, actor, visited)?;
            }
        }
        self.topology.delete_node(id)?;
        if let Some(handle) = handle {
            self.audit.emit(ActivityRecord::new(
                actor,
                Verb::Delete,
                id,
                None,
                ActivityPayload::Entity {
                    object_name: handle.describe(),
                },
            ));
            self.handles.delete_handle(id)?;
        }
        Ok(())
    }

    /// Applies a map of property changes to the entity's graph node.
    ///
    /// - `name` is mirrored into the handle's display name and never removed.
    /// - A null or empty-string value removes the property.
    /// - Unchanged values are no-ops and are not audited.
    ///
    /// Each real change is audited with before/after values; the handle's
    /// modifier bookkeeping is refreshed only if something changed.
    pub fn update_entity_properties(
        &mut self,
        id: HandleId,
        diffs: &PropertyMap,
        actor: &str,
    ) -> Result<(EntityHandle, GraphNode), EngineError> {
        let mut handle = self
            .handles
            .get_handle(id)?
            .ok_or(EngineError::EntityNotFound { id })?;
        let mut node = self.paired_node(id)?;

        let mut changes: Vec<ActivityPayload> = Vec::new();
        for (key, value) in diffs {
            if key == "name" {
                let Some(new_name) = value.as_str().filter(|s| !s.is_empty()) else {
                    continue;
                };
                if node.name != new_name {
                    changes.push(ActivityPayload::EntityProperty {
                        property: key.clone(),
                        value_before: Value::String(node.name.clone()),
                        value_after: value.clone(),
                    });
                    node.name = new_name.to_string();
                    handle.display_name = new_name.to_string();
                }
                continue;
            }
            if is_empty_value(value) {
                if let Some(before) = node.properties.shift_remove(key) {
                    changes.push(ActivityPayload::EntityProperty {
                        property: key.clone(),
                        value_before: before,
                        value_after: Value::Null,
                    });
                }
            } else if node.property(key) != Some(value) {
                let before = node
                    .properties
                    .insert(key.clone(), value.clone())
                    .unwrap_or(Value::Null);
                changes.push(ActivityPayload::EntityProperty {
                    property: key.clone(),
                    value_before: before,
                    value_after: value.clone(),
                });
            }
        }

        if !changes.is_empty() {
            self.topology.update_node(&node)?;
            handle.touch(actor);
            self.handles.update_handle(&handle)?;
            for payload in changes {
                self.audit
                    .emit(ActivityRecord::new(actor, Verb::Update, id, None, payload));
            }
        }
        Ok((handle, node))
    }

    /// Deletes a single relationship edge, auditing the removal and
    /// refreshing the modifier on both endpoint handles. Idempotent:
    /// returns `false` if the edge was already gone.
    pub fn delete_relationship(
        &mut self,
        edge_id: EdgeId,
        actor: &str,
    ) -> Result<bool, EngineError> {
        let Some((from, to, edge)) = self.topology.get_edge(edge_id)? else {
            return Ok(false);
        };
        self.topology.delete_edge(edge_id)?;
        let object_name = self.handles.get_handle(to)?.map(|h| h.describe());
        self.audit.emit(ActivityRecord::new(
            actor,
            Verb::Delete,
            from,
            Some(to),
            ActivityPayload::Relationship {
                relationship_type: edge.relation,
                object_name,
            },
        ));
        self.touch_pair(from, to, actor)?;
        Ok(true)
    }

    // -------------------------------------------------------------------
    // Type definitions
    // -------------------------------------------------------------------

    /// Looks a type definition up by slug, creating it (display name
    /// derived by title-casing the slug) if absent.
    pub fn resolve_type_definition(&mut self, slug: &str) -> Result<TypeDefinition, EngineError> {
        if let Some(def) = self.handles.get_type_definition(slug)? {
            return Ok(def);
        }
        let def = TypeDefinition::from_slug(slug);
        self.handles.upsert_type_definition(&def)?;
        Ok(def)
    }

    /// Deletes a type definition, cascading through the full entity-deletion
    /// path (node pairing plus audit) for every handle of that type.
    /// Returns the number of entities deleted.
    pub fn delete_type_definition(
        &mut self,
        slug: &str,
        actor: &str,
    ) -> Result<usize, EngineError> {
        let members = self.handles.list_handles_by_type(slug)?;
        let mut deleted = 0;
        for handle in members {
            if self.delete_entity(handle.id, actor)? {
                deleted += 1;
            }
        }
        self.handles.delete_type_definition(slug)?;
        tracing::info!(slug, deleted, "type definition deleted");
        Ok(deleted)
    }

    // -------------------------------------------------------------------
    // Shared internals
    // -------------------------------------------------------------------

    /// The paired node of a known-present handle; its absence is a broken
    /// pairing invariant, not a not-found.
    pub(crate) fn paired_node(&self, id: HandleId) -> Result<GraphNode, EngineError> {
        self.topology
            .get_node(id)?
            .ok_or_else(|| EngineError::ConsistencyViolation {
                reason: format!("handle {id} has no paired node"),
            })
    }

    /// Refreshes modifier bookkeeping on both ends of a relationship event.
    pub(crate) fn touch_pair(
        &mut self,
        a: HandleId,
        b: HandleId,
        actor: &str,
    ) -> Result<(), EngineError> {
        for id in [a, b] {
            if let Some(mut handle) = self.handles.get_handle(id)? {
                handle.touch(actor);
                self.handles.update_handle(&handle)?;
            }
        }
        Ok(())
    }
}

fn is_empty_value(value: &Value) -> bool {
    value.is_null() || value.as_str() == Some("")
}
