//! SQLite-backed record store

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::record::{Filter, Record};

/// Database file name inside the store directory
const DB_FILE: &str = "pacestore.db";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE TABLE IF NOT EXISTS record_index (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    field TEXT NOT NULL,
    value,
    PRIMARY KEY (collection, id, field)
);

CREATE INDEX IF NOT EXISTS idx_record_index_lookup
    ON record_index (collection, field, value);
"#;

/// Persistent store of JSON records with indexed fields
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a store in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "Store::open: called");
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path).context(format!("Failed to open {}", db_path.display()))?;
        let store = Self {
            conn,
            path: Some(db_path),
        };
        store.migrate()?;

        info!(path = ?store.path, "Store opened");
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        debug!("Store::open_in_memory: called");
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self { conn, path: None };
        store.migrate()?;
        Ok(store)
    }

    /// Path of the backing database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).context("Failed to apply schema")?;
        Ok(())
    }

    /// Create a new record; fails if the id already exists
    pub fn create<T: Record>(&mut self, record: T) -> Result<String> {
        debug!(collection = T::collection_name(), id = record.id(), "Store::create: called");
        if self.exists::<T>(record.id())? {
            bail!("{} record already exists: {}", T::collection_name(), record.id());
        }
        self.write(&record)?;
        Ok(record.id().to_string())
    }

    /// Insert or replace a record
    pub fn upsert<T: Record>(&mut self, record: T) -> Result<String> {
        debug!(collection = T::collection_name(), id = record.id(), "Store::upsert: called");
        self.write(&record)?;
        Ok(record.id().to_string())
    }

    /// Update an existing record; fails if it does not exist
    pub fn update<T: Record>(&mut self, record: T) -> Result<()> {
        debug!(collection = T::collection_name(), id = record.id(), "Store::update: called");
        if !self.exists::<T>(record.id())? {
            bail!("{} record not found: {}", T::collection_name(), record.id());
        }
        self.write(&record)
    }

    /// Fetch a record by id
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        debug!(collection = T::collection_name(), %id, "Store::get: called");
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![T::collection_name(), id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query record")?;

        match data {
            Some(json) => {
                let record = serde_json::from_str(&json).context("Failed to deserialize record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Delete a record and its index rows; returns whether it existed
    pub fn delete<T: Record>(&mut self, id: &str) -> Result<bool> {
        debug!(collection = T::collection_name(), %id, "Store::delete: called");
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        tx.execute(
            "DELETE FROM record_index WHERE collection = ?1 AND id = ?2",
            params![T::collection_name(), id],
        )?;
        let removed = tx.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![T::collection_name(), id],
        )?;
        tx.commit().context("Failed to commit delete")?;
        Ok(removed > 0)
    }

    /// List records matching all filters, most recently updated first
    pub fn list<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        debug!(collection = T::collection_name(), filter_count = filters.len(), "Store::list: called");
        let mut sql = String::from("SELECT r.data FROM records r WHERE r.collection = ?");
        let mut values = vec![rusqlite::types::Value::Text(T::collection_name().to_string())];

        for filter in filters {
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM record_index i WHERE i.collection = r.collection \
                 AND i.id = r.id AND i.field = ? AND i.value {} ?)",
                filter.op.as_sql()
            ));
            values.push(rusqlite::types::Value::Text(filter.field.clone()));
            values.push(filter.value.to_sql_value());
        }
        sql.push_str(" ORDER BY r.updated_at DESC, r.id ASC");

        let mut stmt = self.conn.prepare(&sql).context("Failed to prepare list query")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))
            .context("Failed to run list query")?;

        let mut records = Vec::new();
        for row in rows {
            let json = row?;
            records.push(serde_json::from_str(&json).context("Failed to deserialize record")?);
        }
        Ok(records)
    }

    /// Recompute index rows for every record of a type
    pub fn rebuild_indexes<T: Record>(&mut self) -> Result<usize> {
        debug!(collection = T::collection_name(), "Store::rebuild_indexes: called");
        let records: Vec<T> = self.list(&[])?;
        let count = records.len();
        for record in &records {
            self.write(record)?;
        }
        Ok(count)
    }

    fn exists<T: Record>(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM records WHERE collection = ?1 AND id = ?2",
                params![T::collection_name(), id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn write<T: Record>(&mut self, record: &T) -> Result<()> {
        let collection = T::collection_name();
        let json = serde_json::to_string(record).context("Failed to serialize record")?;

        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        tx.execute(
            "INSERT OR REPLACE INTO records (collection, id, updated_at, data) VALUES (?1, ?2, ?3, ?4)",
            params![collection, record.id(), record.updated_at(), json],
        )?;
        tx.execute(
            "DELETE FROM record_index WHERE collection = ?1 AND id = ?2",
            params![collection, record.id()],
        )?;
        for (field, value) in record.indexed_fields() {
            tx.execute(
                "INSERT INTO record_index (collection, id, field, value) VALUES (?1, ?2, ?3, ?4)",
                params![collection, record.id(), field, value.to_sql_value()],
            )?;
        }
        tx.commit().context("Failed to commit write")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FilterOp, IndexValue};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        title: String,
        pinned: bool,
        rank: i64,
        updated_at: i64,
    }

    impl Note {
        fn new(id: &str, pinned: bool, rank: i64, updated_at: i64) -> Self {
            Self {
                id: id.to_string(),
                title: format!("note {}", id),
                pinned,
                rank,
                updated_at,
            }
        }
    }

    impl Record for Note {
        fn id(&self) -> &str {
            &self.id
        }

        fn updated_at(&self) -> i64 {
            self.updated_at
        }

        fn collection_name() -> &'static str {
            "notes"
        }

        fn indexed_fields(&self) -> HashMap<String, IndexValue> {
            let mut fields = HashMap::new();
            fields.insert("pinned".to_string(), IndexValue::Bool(self.pinned));
            fields.insert("rank".to_string(), IndexValue::Int(self.rank));
            fields
        }
    }

    #[test]
    fn test_crud_roundtrip() {
        let mut store = Store::open_in_memory().unwrap();

        let id = store.create(Note::new("a", false, 1, 10)).unwrap();
        assert_eq!(id, "a");
        assert!(store.create(Note::new("a", false, 1, 10)).is_err());

        let mut note: Note = store.get("a").unwrap().unwrap();
        note.title = "renamed".to_string();
        store.update(note).unwrap();
        let note: Note = store.get("a").unwrap().unwrap();
        assert_eq!(note.title, "renamed");

        assert!(store.delete::<Note>("a").unwrap());
        assert!(!store.delete::<Note>("a").unwrap());
        assert!(store.get::<Note>("a").unwrap().is_none());
    }

    #[test]
    fn test_update_missing_fails() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store.update(Note::new("ghost", false, 0, 0)).is_err());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert(Note::new("a", true, 1, 10)).unwrap();
        store.upsert(Note::new("a", true, 1, 10)).unwrap();
        let all: Vec<Note> = store.list(&[]).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_list_filters_and_ordering() {
        let mut store = Store::open_in_memory().unwrap();
        store.create(Note::new("old", true, 1, 10)).unwrap();
        store.create(Note::new("new", true, 5, 30)).unwrap();
        store.create(Note::new("other", false, 3, 20)).unwrap();

        let pinned: Vec<Note> = store.list(&[Filter::eq("pinned", true)]).unwrap();
        assert_eq!(
            pinned.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            vec!["new", "old"]
        );

        let ranked: Vec<Note> = store
            .list(&[Filter {
                field: "rank".to_string(),
                op: FilterOp::Gte,
                value: IndexValue::Int(3),
            }])
            .unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let temp = tempdir().unwrap();
        {
            let mut store = Store::open(temp.path()).unwrap();
            store.create(Note::new("keep", false, 0, 1)).unwrap();
        }
        let mut store = Store::open(temp.path()).unwrap();
        assert_eq!(store.rebuild_indexes::<Note>().unwrap(), 1);
        assert!(store.get::<Note>("keep").unwrap().is_some());
    }
}
