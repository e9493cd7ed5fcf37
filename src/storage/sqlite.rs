//! SQLite-backed record store.
//!
//! One connection guarded by a mutex gives single-writer semantics; every
//! call hops onto the blocking pool so request tasks never stall the runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use super::{Record, RecordStore, StorageError};

/// Table definitions, safe to run against an already provisioned database.
pub const SCHEMA: &str = include_str!("schema.sql");

/// A row read back from the `requests` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub method: Option<String>,
    pub path: String,
    pub headers: String,
    pub query: String,
    pub body: Vec<u8>,
    pub received_at: String,
}

impl StoredRecord {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Durable record store over a single SQLite database file.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` for writing.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        configure(&conn, busy_timeout)?;

        tracing::debug!(path = %path.display(), "Opened sqlite store");
        Ok(Self::from_connection(conn))
    }

    /// Open an existing database without write access.
    pub fn open_read_only(path: &Path) -> Result<Self, StorageError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create the `requests` table if it does not exist yet.
    pub fn provision(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Most recent rows first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, method, path, headers, query, body, received_at
                 FROM requests ORDER BY id DESC LIMIT ?1",
            )?;
            let records = stmt
                .query_map(params![limit], stored_record_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<StoredRecord>, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, method, path, headers, query, body, received_at
                 FROM requests WHERE id = ?1",
                params![id],
                stored_record_from_row,
            )
            .optional()
            .map_err(StorageError::from)
        })
        .await
    }

    pub async fn count(&self) -> Result<u64, StorageError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM requests", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, record: Record) -> Result<(), StorageError> {
        self.with_conn(move |conn| insert_blocking(conn, &record)).await
    }
}

fn configure(conn: &Connection, busy_timeout: Duration) -> Result<(), StorageError> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

fn insert_blocking(conn: &Connection, record: &Record) -> Result<(), StorageError> {
    // Bound as TEXT without UTF-8 validation so binary bodies are kept byte for byte.
    let body = ToSqlOutput::Borrowed(ValueRef::Text(&record.body[..]));

    conn.execute(
        "INSERT INTO requests (method, path, headers, query, body) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![record.method, record.path, record.headers, record.query, body],
    )?;
    Ok(())
}

fn stored_record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let body = match row.get_ref(5)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
        _ => Vec::new(),
    };

    Ok(StoredRecord {
        id: row.get(0)?,
        method: row.get(1)?,
        path: row.get(2)?,
        headers: row.get(3)?,
        query: row.get(4)?,
        body,
        received_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn record(path: &str, body: &'static [u8]) -> Record {
        Record::new(
            "POST",
            path,
            r#"{"version":1,"headers":[]}"#.to_string(),
            "a=1".to_string(),
            Bytes::from_static(body),
        )
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.provision().unwrap();

        store.insert(record("/first", b"one")).await.unwrap();
        store.insert(record("/second", b"two")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let rows = store.recent(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].path, "/second");
        assert_eq!(rows[1].path, "/first");
        assert!(rows[0].id > rows[1].id);
        assert_eq!(rows[1].method.as_deref(), Some("POST"));
        assert_eq!(rows[1].query, "a=1");
        assert_eq!(rows[1].body_text(), "one");
    }

    #[tokio::test]
    async fn test_null_method_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.provision().unwrap();

        let mut rec = record("/", b"");
        rec.method = None;
        store.insert(rec).await.unwrap();

        let row = store.get(1).await.unwrap().unwrap();
        assert_eq!(row.method, None);
        assert!(row.body.is_empty());
        assert!(store.get(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_binary_body_is_stored_verbatim() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.provision().unwrap();

        store.insert(record("/bin", b"\x00\xff\xfe raw")).await.unwrap();

        let row = store.get(1).await.unwrap().unwrap();
        assert_eq!(row.body, b"\x00\xff\xfe raw");
    }

    #[test]
    fn test_provision_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.db");

        let store = SqliteStore::open(&path, Duration::from_secs(1)).unwrap();
        store.provision().unwrap();
        store.provision().unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path, Duration::from_secs(1)).unwrap();
        reopened.provision().unwrap();

        let conn = reopened.conn.lock().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'requests'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn test_insert_without_schema_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.insert(record("/", b"")).await;
        assert!(matches!(result, Err(StorageError::Sqlite(_))));
    }
}
