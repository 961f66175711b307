//! LRU-bounded in-memory cache backend.
//!
//! Each entity repository owns one of these. Entries carry their own
//! deadline; a lookup that finds a stale entry drops it and reports a miss.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use toolcheck_core::cache::{Cache, CacheError, Result};

#[derive(Debug, Clone)]
struct Slot {
    bytes: Vec<u8>,
    /// `None` keeps the entry until it is evicted or deleted.
    deadline: Option<Instant>,
}

impl Slot {
    fn new(bytes: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            bytes,
            deadline: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.deadline.map_or(true, |deadline| now < deadline)
    }
}

/// In-memory [`Cache`] with TTL and least-recently-used eviction.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    slots: Arc<Mutex<LruCache<String, Slot>>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` entries.
    ///
    /// # Errors
    ///
    /// Fails if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_entries).ok_or_else(|| {
            CacheError::OperationFailed("max_entries must be > 0".to_string())
        })?;
        Ok(Self {
            slots: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    /// Number of entries held, stale ones not yet looked up included.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();

        let stale = match slots.get(key) {
            Some(slot) if slot.is_live(now) => return Ok(Some(slot.bytes.clone())),
            Some(_) => true,
            None => false,
        };
        if stale {
            slots.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.slots
            .lock()
            .await
            .put(key.to_string(), Slot::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.slots.lock().await.pop(key);
        Ok(())
    }
}
