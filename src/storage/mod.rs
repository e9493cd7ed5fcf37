//! Durable record storage.
//!
//! # Data Flow
//! ```text
//! capture handler
//!     → Record (built once per admitted request)
//!     → RecordStore::insert (single attempt, committed before return)
//!     → requests table (append-only)
//! ```
//!
//! # Design Decisions
//! - The handler depends on `Arc<dyn RecordStore>`, never on SQLite directly
//! - The store serializes writers internally; callers never lock
//! - Schema provisioning is idempotent and runs on every startup

pub mod record;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

pub use record::{canonical_query, decoded_path, HeaderEntry, Record, SerializedHeaders};
pub use sqlite::{SqliteStore, StoredRecord};

/// Errors surfaced by a record store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("storage connection lock poisoned")]
    Poisoned,
}

/// Append-only sink for captured requests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one record. On `Ok` the row is committed.
    async fn insert(&self, record: Record) -> Result<(), StorageError>;
}
