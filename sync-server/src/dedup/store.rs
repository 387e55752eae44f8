//! redb-based deduplication store
//!
//! One table keyed by (namespace, key) holding the expiry timestamp of the
//! record. A record with expiry 0 never expires. Expired records are purged
//! lazily on read.

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Dedup records: (namespace, key) -> expires_at_millis (0 = never)
const DEDUP_TABLE: TableDefinition<(&str, &str), i64> = TableDefinition::new("dedup");

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
}

pub type DedupResult<T> = Result<T, DedupError>;

/// Durable check-and-set store behind the [`Deduplicator`](super::Deduplicator)
#[derive(Clone)]
pub struct DedupStore {
    db: Arc<Database>,
}

impl DedupStore {
    /// Open or create the store
    pub fn open(path: impl AsRef<Path>) -> DedupResult<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DEDUP_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// In-memory store for tests
    #[cfg(test)]
    pub fn open_in_memory() -> DedupResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DEDUP_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Whether a live record exists for the key.
    ///
    /// An expired record counts as absent and is removed.
    pub fn is_executed(&self, namespace: &str, key: &str) -> DedupResult<bool> {
        let expires_at = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(DEDUP_TABLE)?;
            match table.get((namespace, key))? {
                Some(guard) => Some(guard.value()),
                None => None,
            }
        };

        match expires_at {
            None => Ok(false),
            Some(0) => Ok(true),
            Some(expires_at) if expires_at > Utc::now().timestamp_millis() => Ok(true),
            Some(_) => {
                // Expired: purge so a later save starts fresh
                self.delete(namespace, key)?;
                Ok(false)
            }
        }
    }

    /// Record the key as executed, optionally expiring after `ttl`
    pub fn save(&self, namespace: &str, key: &str, ttl: Option<Duration>) -> DedupResult<()> {
        let expires_at = match ttl {
            Some(ttl) => Utc::now().timestamp_millis() + ttl.as_millis() as i64,
            None => 0,
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DEDUP_TABLE)?;
            table.insert((namespace, key), expires_at)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Remove the record, re-enabling the guarded action
    pub fn delete(&self, namespace: &str, key: &str) -> DedupResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DEDUP_TABLE)?;
            table.remove((namespace, key))?;
        }
        write_txn.commit()?;

        Ok(())
    }
}
