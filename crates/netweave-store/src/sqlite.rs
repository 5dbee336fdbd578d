//! SQLite implementations of [`HandleStore`] and [`TopologyStore`].
//!
//! Both stores persist to SQLite with WAL mode, automatic schema migrations,
//! and JSON TEXT columns (via serde_json) for property bags and audit
//! payloads. Multi-statement writes run inside a transaction; single-statement
//! writes rely on SQLite's per-statement atomicity.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use netweave_core::time::now_millis;
use netweave_core::{
    ActivityPayload, ActivityRecord, EdgeId, EntityHandle, GraphEdge, GraphNode, HandleId,
    IdGenerator, MetaType, NewHandle, PropertyMap, RelationType, ReservedId, TypeDefinition, Verb,
};

use crate::error::StoreError;
use crate::traits::{HandleStore, TopologyStore};

// ---------------------------------------------------------------------------
// Row buffers
// ---------------------------------------------------------------------------
//
// Enum columns are read as TEXT and parsed outside the rusqlite row closure,
// so a corrupt stored value surfaces as StoreError::Corrupt rather than a
// synthetic rusqlite error.

struct HandleRow {
    id: i64,
    display_name: String,
    type_slug: String,
    meta_type: String,
    creator: String,
    created_at: i64,
    modifier: String,
    modified_at: i64,
}

impl HandleRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(HandleRow {
            id: row.get(0)?,
            display_name: row.get(1)?,
            type_slug: row.get(2)?,
            meta_type: row.get(3)?,
            creator: row.get(4)?,
            created_at: row.get(5)?,
            modifier: row.get(6)?,
            modified_at: row.get(7)?,
        })
    }

    fn into_handle(self) -> Result<EntityHandle, StoreError> {
        Ok(EntityHandle {
            id: HandleId(self.id),
            display_name: self.display_name,
            type_slug: self.type_slug,
            meta_type: MetaType::parse(&self.meta_type)?,
            creator: self.creator,
            created_at: self.created_at,
            modifier: self.modifier,
            modified_at: self.modified_at,
        })
    }
}

struct ActivityRow {
    actor: String,
    verb: String,
    subject: i64,
    related: Option<i64>,
    payload: String,
    timestamp_ms: i64,
}

impl ActivityRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(ActivityRow {
            actor: row.get(0)?,
            verb: row.get(1)?,
            subject: row.get(2)?,
            related: row.get(3)?,
            payload: row.get(4)?,
            timestamp_ms: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<ActivityRecord, StoreError> {
        let payload: ActivityPayload = serde_json::from_str(&self.payload)?;
        Ok(ActivityRecord {
            actor: self.actor,
            verb: Verb::parse(&self.verb)?,
            subject: HandleId(self.subject),
            related: self.related.map(HandleId),
            payload,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Relational side
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`HandleStore`].
pub struct SqliteHandleStore {
    conn: Connection,
}

impl SqliteHandleStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteHandleStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteHandleStore { conn })
    }
}

impl HandleStore for SqliteHandleStore {
    fn upsert_type_definition(&mut self, def: &TypeDefinition) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO type_definitions (slug, name) VALUES (?1, ?2)
             ON CONFLICT(slug) DO UPDATE SET name = excluded.name",
            params![def.slug, def.name],
        )?;
        Ok(())
    }

    fn get_type_definition(&self, slug: &str) -> Result<Option<TypeDefinition>, StoreError> {
        let def = self
            .conn
            .query_row(
                "SELECT name, slug FROM type_definitions WHERE slug = ?1",
                params![slug],
                |row| {
                    Ok(TypeDefinition {
                        name: row.get(0)?,
                        slug: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(def)
    }

    fn list_type_definitions(&self) -> Result<Vec<TypeDefinition>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name, slug FROM type_definitions ORDER BY slug")?;
        let defs = stmt
            .query_map([], |row| {
                Ok(TypeDefinition {
                    name: row.get(0)?,
                    slug: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(defs)
    }

    fn delete_type_definition(&mut self, slug: &str) -> Result<bool, StoreError> {
        let rows = self
            .conn
            .execute("DELETE FROM type_definitions WHERE slug = ?1", params![slug])?;
        Ok(rows > 0)
    }

    fn insert_handle(&mut self, new: &NewHandle) -> Result<EntityHandle, StoreError> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO entity_handles
               (display_name, type_slug, meta_type, creator, created_at, modifier, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.display_name,
                new.type_slug,
                new.meta_type.as_str(),
                new.actor,
                now,
                new.actor,
                now
            ],
        )?;
        let id = HandleId(self.conn.last_insert_rowid());
        Ok(EntityHandle {
            id,
            display_name: new.display_name.clone(),
            type_slug: new.type_slug.clone(),
            meta_type: new.meta_type,
            creator: new.actor.clone(),
            created_at: now,
            modifier: new.actor.clone(),
            modified_at: now,
        })
    }

    fn get_handle(&self, id: HandleId) -> Result<Option<EntityHandle>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT handle_id, display_name, type_slug, meta_type,
                        creator, created_at, modifier, modified_at
                 FROM entity_handles WHERE handle_id = ?1",
                params![id.0],
                HandleRow::from_row,
            )
            .optional()?;
        row.map(HandleRow::into_handle).transpose()
    }

    fn find_handle(
        &self,
        display_name: &str,
        type_slug: &str,
    ) -> Result<Option<EntityHandle>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT handle_id, display_name, type_slug, meta_type,
                        creator, created_at, modifier, modified_at
                 FROM entity_handles
                 WHERE display_name = ?1 AND type_slug = ?2
                 ORDER BY handle_id LIMIT 1",
                params![display_name, type_slug],
                HandleRow::from_row,
            )
            .optional()?;
        row.map(HandleRow::into_handle).transpose()
    }

    fn list_handles_by_type(&self, type_slug: &str) -> Result<Vec<EntityHandle>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT handle_id, display_name, type_slug, meta_type,
                    creator, created_at, modifier, modified_at
             FROM entity_handles WHERE type_slug = ?1 ORDER BY handle_id",
        )?;
        let rows = stmt
            .query_map(params![type_slug], HandleRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(HandleRow::into_handle).collect()
    }

    fn update_handle(&mut self, handle: &EntityHandle) -> Result<(), StoreError> {
        let rows = self.conn.execute(
            "UPDATE entity_handles
             SET display_name = ?2, type_slug = ?3, meta_type = ?4,
                 modifier = ?5, modified_at = ?6
             WHERE handle_id = ?1",
            params![
                handle.id.0,
                handle.display_name,
                handle.type_slug,
                handle.meta_type.as_str(),
                handle.modifier,
                handle.modified_at
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::HandleNotFound { id: handle.id });
        }
        Ok(())
    }

    fn delete_handle(&mut self, id: HandleId) -> Result<bool, StoreError> {
        let rows = self.conn.execute(
            "DELETE FROM entity_handles WHERE handle_id = ?1",
            params![id.0],
        )?;
        Ok(rows > 0)
    }

    fn create_generator(&mut self, generator: &IdGenerator) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO id_generators
               (name, prefix, suffix, base_counter, zero_fill_width, last_id,
                creator, created_at, modifier, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                generator.name,
                generator.prefix,
                generator.suffix,
                generator.base_counter,
                generator.zero_fill_width,
                generator.last_id,
                generator.creator,
                generator.created_at,
                generator.modifier.as_deref().unwrap_or(&generator.creator),
                generator.modified_at
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::DuplicateGenerator {
                name: generator.name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_generator(&self, name: &str) -> Result<Option<IdGenerator>, StoreError> {
        let generator = self
            .conn
            .query_row(
                "SELECT name, prefix, suffix, base_counter, zero_fill_width, last_id,
                        creator, created_at, modifier, modified_at
                 FROM id_generators WHERE name = ?1",
                params![name],
                |row| {
                    Ok(IdGenerator {
                        name: row.get(0)?,
                        prefix: row.get(1)?,
                        suffix: row.get(2)?,
                        base_counter: row.get(3)?,
                        zero_fill_width: row.get(4)?,
                        last_id: row.get(5)?,
                        creator: row.get(6)?,
                        created_at: row.get(7)?,
                        modifier: row.get(8)?,
                        modified_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(generator)
    }

    fn advance_generator(&mut self, name: &str) -> Result<String, StoreError> {
        // An immediate transaction takes the write lock before the counter
        // is read, so issuers on separate connections queue on the busy
        // handler rather than both reading the same counter value.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let generator = {
            let row = tx
                .query_row(
                    "SELECT name, prefix, suffix, base_counter, zero_fill_width, last_id,
                            creator, created_at, modifier, modified_at
                     FROM id_generators WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok(IdGenerator {
                            name: row.get(0)?,
                            prefix: row.get(1)?,
                            suffix: row.get(2)?,
                            base_counter: row.get(3)?,
                            zero_fill_width: row.get(4)?,
                            last_id: row.get(5)?,
                            creator: row.get(6)?,
                            created_at: row.get(7)?,
                            modifier: row.get(8)?,
                            modified_at: row.get(9)?,
                        })
                    },
                )
                .optional()?;
            row.ok_or_else(|| StoreError::GeneratorNotFound {
                name: name.to_string(),
            })?
        };
        let issued = generator.format(generator.base_counter);
        tx.execute(
            "UPDATE id_generators
             SET base_counter = base_counter + 1, last_id = ?2, modified_at = ?3
             WHERE name = ?1",
            params![name, issued, now_millis()],
        )?;
        tx.commit()?;
        Ok(issued)
    }

    fn try_insert_reservation(
        &mut self,
        collection: &str,
        record: &ReservedId,
    ) -> Result<bool, StoreError> {
        // The primary key on (collection, value) is the final arbiter; the
        // OR IGNORE turns a lost race into `false` rather than an error.
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO reserved_ids
               (collection, value, reserved, reserve_message, reserver, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                collection,
                record.value,
                record.reserved,
                record.reserve_message,
                record.reserver,
                record.created_at
            ],
        )?;
        Ok(rows > 0)
    }

    fn get_reservation(
        &self,
        collection: &str,
        value: &str,
    ) -> Result<Option<ReservedId>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT value, reserved, reserve_message, reserver, created_at
                 FROM reserved_ids WHERE collection = ?1 AND value = ?2",
                params![collection, value],
                |row| {
                    Ok(ReservedId {
                        value: row.get(0)?,
                        reserved: row.get(1)?,
                        reserve_message: row.get(2)?,
                        reserver: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn claim_reservation(&mut self, collection: &str, value: &str) -> Result<(), StoreError> {
        let rows = self.conn.execute(
            "UPDATE reserved_ids SET reserved = 0
             WHERE collection = ?1 AND value = ?2",
            params![collection, value],
        )?;
        if rows == 0 {
            return Err(StoreError::Integrity {
                reason: format!("no reservation '{}' in collection '{}'", value, collection),
            });
        }
        Ok(())
    }

    fn append_activity(&mut self, record: &ActivityRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&record.payload)?;
        self.conn.execute(
            "INSERT INTO activity_log
               (actor, verb, subject, related, payload, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.actor,
                record.verb.as_str(),
                record.subject.0,
                record.related.map(|id| id.0),
                payload,
                record.timestamp_ms
            ],
        )?;
        Ok(())
    }

    fn list_activity(&self, subject: HandleId) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT actor, verb, subject, related, payload, timestamp_ms
             FROM activity_log WHERE subject = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![subject.0], ActivityRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ActivityRow::into_record).collect()
    }
}

// ---------------------------------------------------------------------------
// Graph side
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`TopologyStore`].
///
/// Edges reference their endpoint nodes with `ON DELETE CASCADE`, so node
/// deletion drops touching edges inside SQLite itself.
pub struct SqliteTopologyStore {
    conn: Connection,
}

impl SqliteTopologyStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteTopologyStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteTopologyStore { conn })
    }

    fn node_exists(&self, id: HandleId) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM graph_nodes WHERE handle_id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn edge_from_parts(
        relation: &str,
        properties: &str,
    ) -> Result<GraphEdge, StoreError> {
        Ok(GraphEdge {
            relation: RelationType::parse(relation)?,
            properties: serde_json::from_str::<PropertyMap>(properties)?,
        })
    }
}

impl TopologyStore for SqliteTopologyStore {
    fn create_node(&mut self, node: &GraphNode) -> Result<(), StoreError> {
        let properties = serde_json::to_string(&node.properties)?;
        let result = self.conn.execute(
            "INSERT INTO graph_nodes (handle_id, name, meta_type, properties)
             VALUES (?1, ?2, ?3, ?4)",
            params![node.id.0, node.name, node.meta_type.as_str(), properties],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(StoreError::DuplicateNode { id: node.id })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_node(&self, id: HandleId) -> Result<Option<GraphNode>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT name, meta_type, properties FROM graph_nodes WHERE handle_id = ?1",
                params![id.0],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, meta_type, properties)) = row else {
            return Ok(None);
        };
        Ok(Some(GraphNode {
            id,
            name,
            meta_type: MetaType::parse(&meta_type)?,
            properties: serde_json::from_str(&properties)?,
        }))
    }

    fn update_node(&mut self, node: &GraphNode) -> Result<(), StoreError> {
        let properties = serde_json::to_string(&node.properties)?;
        let rows = self.conn.execute(
            "UPDATE graph_nodes SET name = ?2, meta_type = ?3, properties = ?4
             WHERE handle_id = ?1",
            params![node.id.0, node.name, node.meta_type.as_str(), properties],
        )?;
        if rows == 0 {
            return Err(StoreError::NodeNotFound { id: node.id });
        }
        Ok(())
    }

    fn delete_node(&mut self, id: HandleId) -> Result<bool, StoreError> {
        // ON DELETE CASCADE drops every touching edge.
        let rows = self.conn.execute(
            "DELETE FROM graph_nodes WHERE handle_id = ?1",
            params![id.0],
        )?;
        Ok(rows > 0)
    }

    fn create_edge(
        &mut self,
        relation: RelationType,
        from: HandleId,
        to: HandleId,
        properties: PropertyMap,
    ) -> Result<EdgeId, StoreError> {
        if !self.node_exists(from)? || !self.node_exists(to)? {
            return Err(StoreError::DanglingEdge { from, to });
        }
        let properties = serde_json::to_string(&properties)?;
        self.conn.execute(
            "INSERT INTO graph_edges (relation, from_id, to_id, properties)
             VALUES (?1, ?2, ?3, ?4)",
            params![relation.as_str(), from.0, to.0, properties],
        )?;
        Ok(EdgeId(self.conn.last_insert_rowid()))
    }

    fn get_edge(&self, id: EdgeId) -> Result<Option<(HandleId, HandleId, GraphEdge)>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT relation, from_id, to_id, properties
                 FROM graph_edges WHERE edge_id = ?1",
                params![id.0],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((relation, from, to, properties)) = row else {
            return Ok(None);
        };
        let edge = Self::edge_from_parts(&relation, &properties)?;
        Ok(Some((HandleId(from), HandleId(to), edge)))
    }

    fn delete_edge(&mut self, id: EdgeId) -> Result<bool, StoreError> {
        let rows = self
            .conn
            .execute("DELETE FROM graph_edges WHERE edge_id = ?1", params![id.0])?;
        Ok(rows > 0)
    }

    fn outgoing_edges(
        &self,
        from: HandleId,
        relation: Option<RelationType>,
    ) -> Result<Vec<(EdgeId, HandleId, GraphEdge)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT edge_id, to_id, relation, properties
             FROM graph_edges WHERE from_id = ?1 ORDER BY edge_id",
        )?;
        let rows = stmt
            .query_map(params![from.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut edges = Vec::with_capacity(rows.len());
        for (edge_id, to, rel, properties) in rows {
            let edge = Self::edge_from_parts(&rel, &properties)?;
            if relation.is_none_or(|r| edge.relation == r) {
                edges.push((EdgeId(edge_id), HandleId(to), edge));
            }
        }
        Ok(edges)
    }

    fn edges_between(
        &self,
        from: HandleId,
        to: HandleId,
        relation: Option<RelationType>,
    ) -> Result<Vec<EdgeId>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT edge_id, relation FROM graph_edges
             WHERE from_id = ?1 AND to_id = ?2 ORDER BY edge_id",
        )?;
        let rows = stmt
            .query_map(params![from.0, to.0], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut ids = Vec::with_capacity(rows.len());
        for (edge_id, rel) in rows {
            let rel = RelationType::parse(&rel)?;
            if relation.is_none_or(|r| rel == r) {
                ids.push(EdgeId(edge_id));
            }
        }
        Ok(ids)
    }

    fn node_meta_type(&self, id: HandleId) -> Result<Option<MetaType>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT meta_type FROM graph_nodes WHERE handle_id = ?1",
                params![id.0],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        value.map(|s| MetaType::parse(&s).map_err(StoreError::from)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netweave_core::{ActivityPayload, MetaType, Verb};

    fn new_handle(name: &str, slug: &str, meta: MetaType) -> NewHandle {
        NewHandle {
            display_name: name.to_string(),
            type_slug: slug.to_string(),
            meta_type: meta,
            actor: "tester".to_string(),
        }
    }

    #[test]
    fn handle_roundtrip_and_lookup() {
        let mut store = SqliteHandleStore::in_memory().unwrap();
        let handle = store
            .insert_handle(&new_handle("r1", "router", MetaType::Physical))
            .unwrap();
        assert_eq!(store.get_handle(handle.id).unwrap().unwrap(), handle);
        assert_eq!(
            store.find_handle("r1", "router").unwrap().unwrap().id,
            handle.id
        );
        assert!(store.find_handle("r1", "switch").unwrap().is_none());

        assert!(store.delete_handle(handle.id).unwrap());
        assert!(!store.delete_handle(handle.id).unwrap());
    }

    #[test]
    fn update_handle_missing_row_errors() {
        let mut store = SqliteHandleStore::in_memory().unwrap();
        let mut handle = store
            .insert_handle(&new_handle("r1", "router", MetaType::Physical))
            .unwrap();
        handle.id = HandleId(999);
        assert!(matches!(
            store.update_handle(&handle),
            Err(StoreError::HandleNotFound { .. })
        ));
    }

    #[test]
    fn type_definition_upsert_replaces_name() {
        let mut store = SqliteHandleStore::in_memory().unwrap();
        store
            .upsert_type_definition(&TypeDefinition::from_slug("optical-node"))
            .unwrap();
        store
            .upsert_type_definition(&TypeDefinition {
                name: "Optical Node v2".into(),
                slug: "optical-node".into(),
            })
            .unwrap();
        let defs = store.list_type_definitions().unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "Optical Node v2");
    }

    #[test]
    fn advance_generator_matches_memory_semantics() {
        let mut store = SqliteHandleStore::in_memory().unwrap();
        let generator = IdGenerator::new(
            "service_id",
            Some("NU-S".to_string()),
            None,
            Some(6),
            "admin",
        );
        store.create_generator(&generator).unwrap();
        assert!(matches!(
            store.create_generator(&generator),
            Err(StoreError::DuplicateGenerator { .. })
        ));

        assert_eq!(store.advance_generator("service_id").unwrap(), "NU-S000001");
        assert_eq!(store.advance_generator("service_id").unwrap(), "NU-S000002");
        let stored = store.get_generator("service_id").unwrap().unwrap();
        assert_eq!(stored.base_counter, 3);
        assert_eq!(stored.last_id.as_deref(), Some("NU-S000002"));
    }

    #[test]
    fn advance_generator_serializes_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generators.db");
        let path = path.to_string_lossy().to_string();
        {
            let mut store = SqliteHandleStore::new(&path).unwrap();
            let generator = IdGenerator::new(
                "service_id",
                Some("NU-S".to_string()),
                None,
                Some(6),
                "admin",
            );
            store.create_generator(&generator).unwrap();
        }

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut store = SqliteHandleStore::new(&path).unwrap();
                    (0..50)
                        .map(|_| store.advance_generator("service_id").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut issued: Vec<String> = Vec::new();
        for thread in threads {
            issued.extend(thread.join().unwrap());
        }
        assert_eq!(issued.len(), 200);
        issued.sort();
        issued.dedup();
        assert_eq!(issued.len(), 200);

        let store = SqliteHandleStore::new(&path).unwrap();
        let stored = store.get_generator("service_id").unwrap().unwrap();
        assert_eq!(stored.base_counter, 201);
    }

    #[test]
    fn reservation_uniqueness_per_collection() {
        let mut store = SqliteHandleStore::in_memory().unwrap();
        let entry = ReservedId::taken("cable1");
        assert!(store.try_insert_reservation("nordunet", &entry).unwrap());
        assert!(!store.try_insert_reservation("nordunet", &entry).unwrap());
        assert!(store.try_insert_reservation("sunet", &entry).unwrap());

        let reservation = ReservedId::reservation("NU-S000100", "import", "alice");
        store
            .try_insert_reservation("nordunet", &reservation)
            .unwrap();
        store.claim_reservation("nordunet", "NU-S000100").unwrap();
        assert!(
            !store
                .get_reservation("nordunet", "NU-S000100")
                .unwrap()
                .unwrap()
                .reserved
        );
        assert!(store.claim_reservation("nordunet", "missing").is_err());
    }

    #[test]
    fn activity_log_roundtrip() {
        let mut store = SqliteHandleStore::in_memory().unwrap();
        let record = ActivityRecord::new(
            "alice",
            Verb::Create,
            HandleId(1),
            None,
            ActivityPayload::Entity {
                object_name: "router r1".into(),
            },
        );
        store.append_activity(&record).unwrap();
        let listed = store.list_activity(HandleId(1)).unwrap();
        assert_eq!(listed, vec![record]);
        assert!(store.list_activity(HandleId(2)).unwrap().is_empty());
    }

    #[test]
    fn node_and_edge_roundtrip() {
        let mut topo = SqliteTopologyStore::in_memory().unwrap();
        let mut node = GraphNode::new(HandleId(1), "r1", MetaType::Physical);
        node.properties
            .insert("os".into(), serde_json::json!("junos"));
        topo.create_node(&node).unwrap();
        topo.create_node(&GraphNode::new(HandleId(2), "site-a", MetaType::Location))
            .unwrap();

        assert!(matches!(
            topo.create_node(&GraphNode::new(HandleId(1), "dup", MetaType::Physical)),
            Err(StoreError::DuplicateNode { .. })
        ));

        let stored = topo.get_node(HandleId(1)).unwrap().unwrap();
        assert_eq!(stored, node);
        assert_eq!(
            topo.node_meta_type(HandleId(2)).unwrap(),
            Some(MetaType::Location)
        );

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
        assert_eq!(
            topo.edges_between(HandleId(1), HandleId(2), None).unwrap(),
            vec![edge_id]
        );
    }

    #[test]
    fn deleting_node_cascades_to_edges() {
        let mut topo = SqliteTopologyStore::in_memory().unwrap();
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

        assert!(matches!(
            topo.create_edge(
                RelationType::Has,
                HandleId(1),
                HandleId(2),
                PropertyMap::new()
            ),
            Err(StoreError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netweave.db");
        let path = path.to_string_lossy().to_string();

        let handle = {
            let mut store = SqliteHandleStore::new(&path).unwrap();
            store
                .insert_handle(&new_handle("r1", "router", MetaType::Physical))
                .unwrap()
        };

        let store = SqliteHandleStore::new(&path).unwrap();
        assert_eq!(store.get_handle(handle.id).unwrap().unwrap(), handle);
    }
}
