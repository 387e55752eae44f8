//! Idempotence guard
//!
//! Every workflow step runs under at-least-once delivery; the deduplicator
//! decides whether the side-effecting work for a logical operation already
//! ran. The builder is a plain value — namespace and TTL travel with the
//! guard instead of living in shared mutable state, so concurrent handlers
//! can never contaminate each other's keys.

pub mod store;

pub use store::{DedupError, DedupResult, DedupStore};

use std::sync::Arc;
use std::time::Duration;

/// Value-returning guard builder.
///
/// ```ignore
/// let guard = Deduplicator::new(store)
///     .namespace("ozon-orders")
///     .ttl(Duration::from_secs(86400))
///     .keys([number, "cancel-orders"]);
///
/// if guard.is_executed()? {
///     return Ok(());
/// }
/// // ... side effect ...
/// guard.save()?;
/// ```
#[derive(Clone)]
pub struct Deduplicator {
    store: Arc<DedupStore>,
    namespace: String,
    ttl: Option<Duration>,
}

impl Deduplicator {
    pub fn new(store: Arc<DedupStore>) -> Self {
        Self {
            store,
            namespace: "default".to_string(),
            ttl: None,
        }
    }

    /// Scope subsequent guards to a namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Expire records after `ttl`; without it records live forever
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Build the guard for a composite key
    pub fn keys<I, S>(&self, parts: I) -> DedupGuard
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = parts
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("|");

        DedupGuard {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            ttl: self.ttl,
            key,
        }
    }
}

/// Handle for one deduplication record
pub struct DedupGuard {
    store: Arc<DedupStore>,
    namespace: String,
    ttl: Option<Duration>,
    key: String,
}

impl DedupGuard {
    /// Whether the guarded operation already ran (within the TTL window)
    pub fn is_executed(&self) -> DedupResult<bool> {
        self.store.is_executed(&self.namespace, &self.key)
    }

    /// Mark the operation as executed
    pub fn save(&self) -> DedupResult<()> {
        self.store.save(&self.namespace, &self.key, self.ttl)
    }

    /// Roll the record back, re-enabling the operation
    pub fn delete(&self) -> DedupResult<()> {
        self.store.delete(&self.namespace, &self.key)
    }
}
