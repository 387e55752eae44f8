//! Sticker cache
//!
//! Rasterized labels keyed by posting number (marketplace prefix stripped)
//! in a dedicated redb table, so unrelated cache flushes never evict them.
//! A successful label lives for a week — labels rarely change and the
//! marketplace rate-limits regeneration. A failed fetch leaves a short-lived
//! marker that suppresses a thundering herd of retries for one second.
//!
//! `get_or_try_compute` serializes writers per key: of N concurrent jobs for
//! one posting, exactly one performs the expensive fetch-and-transcode while
//! the rest wait and read the cached result.

use chrono::Utc;
use dashmap::DashMap;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::order::marketplace_number;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Stickers: posting number -> (expires_at_millis, png bytes).
/// Empty bytes mark a recent failed fetch.
const STICKERS_TABLE: TableDefinition<&str, (i64, &[u8])> = TableDefinition::new("stickers");

/// Lifetime of a successfully fetched sticker
pub const STICKER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Lifetime of the failure marker
const FAILURE_MARKER_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StickerCacheError {
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

pub type StickerCacheResult<T> = Result<T, StickerCacheError>;

/// Label cache with per-key write serialization
#[derive(Clone)]
pub struct StickerCache {
    db: Arc<Database>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl StickerCache {
    pub fn open(path: impl AsRef<Path>) -> StickerCacheResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> StickerCacheResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StickerCacheResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(STICKERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            locks: Arc::new(DashMap::new()),
        })
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn read_entry(&self, key: &str) -> StickerCacheResult<Option<(i64, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STICKERS_TABLE)?;

        match table.get(key)? {
            Some(guard) => {
                let (expires_at, bytes) = guard.value();
                Ok(Some((expires_at, bytes.to_vec())))
            }
            None => Ok(None),
        }
    }

    fn write_entry(&self, key: &str, bytes: &[u8], ttl: Duration) -> StickerCacheResult<()> {
        let expires_at = Self::now_millis() + ttl.as_millis() as i64;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STICKERS_TABLE)?;
            table.insert(key, (expires_at, bytes))?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Fetch a cached sticker. Expired entries and failure markers read as
    /// a miss.
    pub fn get(&self, posting_number: &str) -> StickerCacheResult<Option<Vec<u8>>> {
        let key = marketplace_number(posting_number);

        match self.read_entry(key)? {
            Some((expires_at, bytes))
                if expires_at > Self::now_millis() && !bytes.is_empty() =>
            {
                Ok(Some(bytes))
            }
            _ => Ok(None),
        }
    }

    /// Store a sticker
    pub fn put(
        &self,
        posting_number: &str,
        bytes: &[u8],
        ttl: Duration,
    ) -> StickerCacheResult<()> {
        self.write_entry(marketplace_number(posting_number), bytes, ttl)
    }

    /// Evict a sticker (readability check failed)
    pub fn delete(&self, posting_number: &str) -> StickerCacheResult<()> {
        let key = marketplace_number(posting_number);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STICKERS_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Serve from cache, computing on a miss with at-most-one concurrent
    /// computation per key.
    ///
    /// `compute` returns `None` when the sticker could not be produced; the
    /// miss is then memoized for [`FAILURE_MARKER_TTL`] so concurrent jobs
    /// for the same posting do not pile onto the marketplace. The caller
    /// re-enqueues with its own delay.
    pub async fn get_or_try_compute<F, Fut>(
        &self,
        posting_number: &str,
        ttl: Duration,
        compute: F,
    ) -> StickerCacheResult<Option<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Vec<u8>>>,
    {
        let key = marketplace_number(posting_number).to_string();

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _held = lock.lock().await;

        // Re-check under the lock: a concurrent job may have filled the
        // entry while this one waited
        if let Some((expires_at, bytes)) = self.read_entry(&key)? {
            if expires_at > Self::now_millis() {
                if bytes.is_empty() {
                    // Recent failure, do not recompute yet
                    return Ok(None);
                }
                return Ok(Some(bytes));
            }
        }

        match compute().await {
            Some(bytes) => {
                self.write_entry(&key, &bytes, ttl)?;
                Ok(Some(bytes))
            }
            None => {
                self.write_entry(&key, &[], FAILURE_MARKER_TTL)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_put_get_roundtrip_strips_prefix() {
        let cache = StickerCache::open_in_memory().unwrap();

        cache.put("O-1-1-1", b"png-bytes", STICKER_TTL).unwrap();

        // Prefixed and raw keys address the same entry
        assert_eq!(cache.get("O-1-1-1").unwrap().unwrap(), b"png-bytes");
        assert_eq!(cache.get("1-1-1").unwrap().unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_miss() {
        let cache = StickerCache::open_in_memory().unwrap();

        cache.put("1-1-1", b"png-bytes", Duration::ZERO).unwrap();
        assert!(cache.get("1-1-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_evicts() {
        let cache = StickerCache::open_in_memory().unwrap();

        cache.put("1-1-1", b"png-bytes", STICKER_TTL).unwrap();
        cache.delete("O-1-1-1").unwrap();
        assert!(cache.get("1-1-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_compute_runs_once_for_concurrent_readers() {
        let cache = StickerCache::open_in_memory().unwrap();
        let computed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let computed = computed.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_compute("1-1-1", STICKER_TTL, || async {
                        computed.fetch_add(1, Ordering::SeqCst);
                        Some(b"png-bytes".to_vec())
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), b"png-bytes");
        }

        // The expensive fetch ran exactly once; everyone else read cache
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_compute_is_memoized_briefly() {
        let cache = StickerCache::open_in_memory().unwrap();
        let computed = Arc::new(AtomicUsize::new(0));

        let attempts = computed.clone();
        let result = cache
            .get_or_try_compute("1-1-1", STICKER_TTL, || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                None
            })
            .await
            .unwrap();
        assert!(result.is_none());

        // Within the marker window the compute is not re-attempted
        let attempts = computed.clone();
        let result = cache
            .get_or_try_compute("1-1-1", STICKER_TTL, || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Some(b"late".to_vec())
            })
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }
}
