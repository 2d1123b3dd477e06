//! SQLite storage implementation
//!
//! SQLite-based implementation of the Storage trait. Span lists and stub
//! lists are stored as JSON text columns.

use crate::model::{
    EntityKind, EntityRecord, EntityStub, RelationDescriptor, RelationStatus, TimeSpan,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult, VisitedMap};
use crate::storage::{RunRecord, RunStatus};
use crate::DiscographError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, DiscographError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, DiscographError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<(EntityRecord, String, String)> {
        let kind_str: String = row.get(1)?;
        let stubs_json: String = row.get(10)?;
        let visited_str: String = row.get(11)?;

        let record = EntityRecord {
            kind: EntityKind::from_db_string(&kind_str).unwrap_or(EntityKind::Band),
            reference: row.get(0)?,
            name: row.get(2)?,
            country: row.get(3)?,
            genre: row.get(4)?,
            formed_year: row.get(5)?,
            real_name: row.get(6)?,
            birthplace: row.get(7)?,
            release_year: row.get(8)?,
            label_name: row.get(9)?,
            stubs: Vec::new(),
            visited_at: Utc::now(),
        };
        Ok((record, stubs_json, visited_str))
    }
}

const ENTITY_COLUMNS: &str = "reference, kind, name, country, genre, formed_year, \
     real_name, birthplace, release_year, label_name, stubs, visited_at";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status
             FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Entity / Relation Writes =====

    fn upsert_entity(&mut self, record: &EntityRecord) -> StorageResult<()> {
        if record.reference.is_empty() || record.name.is_empty() {
            return Err(StorageError::Definitive(format!(
                "entity record missing reference or name: {:?}",
                record.reference
            )));
        }

        let stubs = serde_json::to_string(&record.stubs)?;
        self.conn.execute(
            "INSERT INTO entities (reference, kind, name, country, genre, formed_year,
                 real_name, birthplace, release_year, label_name, stubs, visited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(reference) DO UPDATE SET
                 kind = excluded.kind,
                 name = excluded.name,
                 country = excluded.country,
                 genre = excluded.genre,
                 formed_year = excluded.formed_year,
                 real_name = excluded.real_name,
                 birthplace = excluded.birthplace,
                 release_year = excluded.release_year,
                 label_name = excluded.label_name,
                 stubs = excluded.stubs,
                 visited_at = excluded.visited_at",
            params![
                record.reference,
                record.kind.to_db_string(),
                record.name,
                record.country,
                record.genre,
                record.formed_year,
                record.real_name,
                record.birthplace,
                record.release_year,
                record.label_name,
                stubs,
                record.visited_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn upsert_relation(&mut self, descriptor: &RelationDescriptor) -> StorageResult<()> {
        if descriptor.subject_ref.is_empty() || descriptor.object_ref.is_empty() {
            return Err(StorageError::Definitive(
                "relation descriptor missing subject or object".to_string(),
            ));
        }

        let spans = serde_json::to_string(&descriptor.spans)?;
        self.conn.execute(
            "INSERT INTO relations (subject_ref, object_ref, role, status, spans)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(subject_ref, object_ref, role) DO UPDATE SET
                 status = excluded.status,
                 spans = excluded.spans",
            params![
                descriptor.subject_ref,
                descriptor.object_ref,
                descriptor.role,
                descriptor.status.to_db_string(),
                spans,
            ],
        )?;
        Ok(())
    }

    // ===== Reads =====

    fn list_visited(&self) -> StorageResult<VisitedMap> {
        let mut stmt = self
            .conn
            .prepare("SELECT reference, kind, visited_at FROM entities")?;

        let mut visited: VisitedMap = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        for row in rows {
            let (reference, kind_str, visited_str) = row?;
            let Some(kind) = EntityKind::from_db_string(&kind_str) else {
                continue;
            };
            let timestamp = DateTime::parse_from_rfc3339(&visited_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            visited.entry(kind).or_default().insert(reference, timestamp);
        }

        Ok(visited)
    }

    fn load_entities(&self) -> StorageResult<Vec<EntityRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM entities ORDER BY reference",
            ENTITY_COLUMNS
        ))?;

        let rows = stmt.query_map([], Self::row_to_entity)?;

        let mut entities = Vec::new();
        for row in rows {
            let (mut record, stubs_json, visited_str) = row?;
            record.stubs = serde_json::from_str::<Vec<EntityStub>>(&stubs_json)?;
            record.visited_at = DateTime::parse_from_rfc3339(&visited_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entities.push(record);
        }

        Ok(entities)
    }

    fn load_relations(&self) -> StorageResult<Vec<RelationDescriptor>> {
        let mut stmt = self.conn.prepare(
            "SELECT subject_ref, object_ref, role, status, spans
             FROM relations ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut relations = Vec::new();
        for row in rows {
            let (subject_ref, object_ref, role, status_str, spans_json) = row?;
            relations.push(RelationDescriptor {
                subject_ref,
                object_ref,
                role,
                status: RelationStatus::from_db_string(&status_str)
                    .unwrap_or(RelationStatus::Unknown),
                spans: serde_json::from_str::<Vec<TimeSpan>>(&spans_json)?,
            });
        }

        Ok(relations)
    }

    // ===== Statistics =====

    fn count_entities(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_relations(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bound, TimeSpan};

    fn band(reference: &str, name: &str) -> EntityRecord {
        let mut record = EntityRecord::new(EntityKind::Band, reference, name);
        record.country = Some("Sweden".to_string());
        record.genre = Some("Doom Metal".to_string());
        record.formed_year = Some(1989);
        record
    }

    #[test]
    fn test_upsert_and_load_entity() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_entity(&band("bands/wyrm/42", "Wyrm")).unwrap();

        let entities = storage.load_entities().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].reference, "bands/wyrm/42");
        assert_eq!(entities[0].country.as_deref(), Some("Sweden"));
        assert_eq!(entities[0].formed_year, Some(1989));
    }

    #[test]
    fn test_upsert_entity_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_entity(&band("bands/wyrm/42", "Wyrm")).unwrap();

        let mut updated = band("bands/wyrm/42", "Wyrm");
        updated.genre = Some("Death Doom".to_string());
        storage.upsert_entity(&updated).unwrap();

        let entities = storage.load_entities().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].genre.as_deref(), Some("Death Doom"));
    }

    #[test]
    fn test_empty_record_rejected_definitively() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = EntityRecord::new(EntityKind::Band, "", "Wyrm");
        let err = storage.upsert_entity(&record).unwrap_err();
        assert!(matches!(err, StorageError::Definitive(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_relation_spans_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let relation = RelationDescriptor {
            subject_ref: "artists/j-doe/7".to_string(),
            object_ref: "bands/wyrm/42".to_string(),
            role: "Bass".to_string(),
            status: RelationStatus::Past,
            spans: vec![
                TimeSpan::new(Bound::Year(1989), Bound::Year(2004)),
                TimeSpan::new(Bound::Year(2017), Bound::Present),
            ],
        };
        storage.upsert_relation(&relation).unwrap();

        let loaded = storage.load_relations().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], relation);
    }

    #[test]
    fn test_same_pair_multiple_roles() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for role in ["Bass", "Vocals"] {
            storage
                .upsert_relation(&RelationDescriptor {
                    subject_ref: "artists/j-doe/7".to_string(),
                    object_ref: "bands/wyrm/42".to_string(),
                    role: role.to_string(),
                    status: RelationStatus::Current,
                    spans: vec![],
                })
                .unwrap();
        }
        assert_eq!(storage.count_relations().unwrap(), 2);
    }

    #[test]
    fn test_list_visited_grouped_by_kind() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_entity(&band("bands/wyrm/42", "Wyrm")).unwrap();
        storage
            .upsert_entity(&EntityRecord::new(
                EntityKind::Artist,
                "artists/j-doe/7",
                "J. Doe",
            ))
            .unwrap();

        let visited = storage.list_visited().unwrap();
        assert!(visited[&EntityKind::Band].contains_key("bands/wyrm/42"));
        assert!(visited[&EntityKind::Artist].contains_key("artists/j-doe/7"));
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("abc123").unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Running);

        storage.complete_run(run_id).unwrap();
        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_complete_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.complete_run(999).unwrap_err(),
            StorageError::RunNotFound(999)
        ));
    }
}
