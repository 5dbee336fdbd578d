//! Relationship assignment and the meta-type transition state machine.
//!
//! The assignment family (`set_location`, `set_owner`, ...) shares one
//! contract: auto-convert the source's role when the relationship demands
//! the other transitionable role, create the edge only if no equivalent one
//! exists, and audit creation only when an edge was actually created. The
//! Logical<->Physical transitions rewrite ownership edges (`Uses` <-> `Owns`)
//! and destructively drop role-specific edges (`Depends_on`, `Located_in`).

use netweave_core::{
    ActivityPayload, ActivityRecord, EdgeId, EntityHandle, GraphNode, HandleId, MetaType,
    PropertyMap, RelationType, Verb,
};
use netweave_store::{HandleStore, TopologyStore};

use crate::audit::AuditLog;
use crate::engine::LifecycleEngine;
use crate::error::EngineError;

/// Result of a relationship-assignment operation: the edge (existing or
/// new) and whether this call created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationOutcome {
    pub edge_id: EdgeId,
    pub created: bool,
}

impl<H, T, A> LifecycleEngine<H, T, A>
where
    H: HandleStore,
    T: TopologyStore,
    A: AuditLog,
{
    // -------------------------------------------------------------------
    // Assignment family
    // -------------------------------------------------------------------

    /// Places an entity in a location (`Located_in`). Auto-converts a
    /// Logical source to Physical.
    pub fn set_location(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::LocatedIn, source, target, actor)
    }

    /// Declares physical ownership (`Owns`). Auto-converts a Logical
    /// source to Physical.
    pub fn set_owner(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::Owns, source, target, actor)
    }

    /// Declares logical ownership (`Uses`). Auto-converts a Physical
    /// source to Logical.
    pub fn set_user(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::Uses, source, target, actor)
    }

    /// Declares a logical dependency (`Depends_on`). Auto-converts a
    /// Physical source to Logical.
    pub fn set_dependency(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::DependsOn, source, target, actor)
    }

    /// Makes an organisation responsible for a location
    /// (`Responsible_for`). The source role is not convertible.
    pub fn set_responsible_for(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::ResponsibleFor, source, target, actor)
    }

    /// Attaches a logical component to its physical carrier (`Part_of`).
    pub fn set_part_of(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::PartOf, source, target, actor)
    }

    /// Declares physical containment (`Has`).
    pub fn set_has(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::Has, source, target, actor)
    }

    /// Declares cable connectivity (`Connected_to`).
    pub fn set_connected_to(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::ConnectedTo, source, target, actor)
    }

    /// Declares provisioning (`Provides`). The source role is not
    /// convertible.
    pub fn set_provider(
        &mut self,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        self.assign(RelationType::Provides, source, target, actor)
    }

    /// The shared contract behind the assignment family.
    fn assign(
        &mut self,
        relation: RelationType,
        source: HandleId,
        target: HandleId,
        actor: &str,
    ) -> Result<RelationOutcome, EngineError> {
        let target_meta = self
            .topology
            .node_meta_type(target)?
            .ok_or(EngineError::TargetNotFound { id: target })?;
        let source_handle = self
            .handles
            .get_handle(source)?
            .ok_or(EngineError::EntityNotFound { id: source })?;

        if !relation.allows(source_handle.meta_type, target_meta) {
            let converted = match source_handle.meta_type {
                MetaType::Logical if relation.allows(MetaType::Physical, target_meta) => {
                    self.logical_to_physical(source, actor)?;
                    true
                }
                MetaType::Physical if relation.allows(MetaType::Logical, target_meta) => {
                    self.physical_to_logical(source, actor)?;
                    true
                }
                _ => false,
            };
            if !converted {
                return Err(EngineError::InvalidRole {
                    meta_type: source_handle.meta_type,
                    relation,
                });
            }
        }

        // At-most-one edge of a given type to a given target: re-invoking
        // with the same target is a no-op for audit purposes.
        if let Some(&edge_id) = self
            .topology
            .edges_between(source, target, Some(relation))?
            .first()
        {
            return Ok(RelationOutcome {
                edge_id,
                created: false,
            });
        }

        let edge_id = self
            .topology
            .create_edge(relation, source, target, PropertyMap::new())?;
        tracing::debug!(%relation, %source, %target, "relationship created");
        let object_name = self.handles.get_handle(target)?.map(|h| h.describe());
        self.audit.emit(ActivityRecord::new(
            actor,
            Verb::Create,
            source,
            Some(target),
            ActivityPayload::Relationship {
                relationship_type: relation,
                object_name,
            },
        ));
        self.touch_pair(source, target, actor)?;
        Ok(RelationOutcome {
            edge_id,
            created: true,
        })
    }

    // -------------------------------------------------------------------
    // Meta-type transitions
    // -------------------------------------------------------------------

    /// Reclassifies a Logical entity as Physical.
    ///
    /// Every outgoing `Uses` edge is rewritten to an `Owns` edge to the same
    /// target (creation audited by the ownership assignment, the removal of
    /// the old edge audited here); every outgoing `Depends_on` edge is
    /// dropped with an audited deletion. A Physical entity declares neither.
    pub fn logical_to_physical(
        &mut self,
        id: HandleId,
        actor: &str,
    ) -> Result<(EntityHandle, GraphNode), EngineError> {
        self.flip_meta_type(id, MetaType::Logical, MetaType::Physical, actor)?;

        for (edge_id, target, _) in self.topology.outgoing_edges(id, Some(RelationType::Uses))? {
            self.set_owner(id, target, actor)?;
            self.remove_edge_audited(edge_id, id, target, RelationType::Uses, actor)?;
        }
        for (edge_id, target, _) in self
            .topology
            .outgoing_edges(id, Some(RelationType::DependsOn))?
        {
            self.remove_edge_audited(edge_id, id, target, RelationType::DependsOn, actor)?;
        }

        self.reread(id)
    }

    /// Reclassifies a Physical entity as Logical.
    ///
    /// Every outgoing `Located_in` edge is dropped first (audited), then
    /// every outgoing `Owns` edge is rewritten to a `Uses` edge to the same
    /// target. A Logical entity has no physical placement or ownership.
    pub fn physical_to_logical(
        &mut self,
        id: HandleId,
        actor: &str,
    ) -> Result<(EntityHandle, GraphNode), EngineError> {
        // Placement must go before the flip: a Logical source could not
        // originate Located_in edges.
        let handle = self
            .handles
            .get_handle(id)?
            .ok_or(EngineError::EntityNotFound { id })?;
        if handle.meta_type != MetaType::Physical {
            return Err(EngineError::InvalidTransition {
                id,
                expected: MetaType::Physical,
                actual: handle.meta_type,
            });
        }
        for (edge_id, target, _) in self
            .topology
            .outgoing_edges(id, Some(RelationType::LocatedIn))?
        {
            self.remove_edge_audited(edge_id, id, target, RelationType::LocatedIn, actor)?;
        }

        self.flip_meta_type(id, MetaType::Physical, MetaType::Logical, actor)?;

        for (edge_id, target, _) in self.topology.outgoing_edges(id, Some(RelationType::Owns))? {
            self.set_user(id, target, actor)?;
            self.remove_edge_audited(edge_id, id, target, RelationType::Owns, actor)?;
        }

        self.reread(id)
    }

    /// Checks the transition precondition, then persists the new role on
    /// both the node and the handle.
    fn flip_meta_type(
        &mut self,
        id: HandleId,
        expected: MetaType,
        to: MetaType,
        actor: &str,
    ) -> Result<(), EngineError> {
        let mut handle = self
            .handles
            .get_handle(id)?
            .ok_or(EngineError::EntityNotFound { id })?;
        if handle.meta_type != expected {
            return Err(EngineError::InvalidTransition {
                id,
                expected,
                actual: handle.meta_type,
            });
        }
        let mut node = self.paired_node(id)?;
        node.meta_type = to;
        self.topology.update_node(&node)?;
        handle.meta_type = to;
        handle.touch(actor);
        self.handles.update_handle(&handle)?;
        tracing::info!(%id, from = %expected, %to, "entity reclassified");
        Ok(())
    }

    /// Deletes one edge and audits the removal.
    fn remove_edge_audited(
        &mut self,
        edge_id: EdgeId,
        from: HandleId,
        to: HandleId,
        relation: RelationType,
        actor: &str,
    ) -> Result<(), EngineError> {
        self.topology.delete_edge(edge_id)?;
        let object_name = self.handles.get_handle(to)?.map(|h| h.describe());
        self.audit.emit(ActivityRecord::new(
            actor,
            Verb::Delete,
            from,
            Some(to),
            ActivityPayload::Relationship {
                relationship_type: relation,
                object_name,
            },
        ));
        Ok(())
    }

    /// Fresh handle/node pair after a transition's rewrites settled.
    fn reread(&self, id: HandleId) -> Result<(EntityHandle, GraphNode), EngineError> {
        let handle = self
            .handles
            .get_handle(id)?
            .ok_or(EngineError::EntityNotFound { id })?;
        let node = self.paired_node(id)?;
        Ok((handle, node))
    }
}
