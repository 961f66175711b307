//! Typed cache store with read-through and refresh-ahead.
//!
//! `CacheStore` sits on top of a byte-level [`Cache`] backend and adds:
//!
//! - JSON encoding of cached values
//! - a fixed TTL applied to every write
//! - `get_or_create` / `get_or_create_async` read-through helpers
//! - `refresh_ahead`, a bounded background schedule that recomputes a key
//!
//! Concurrent misses on the same key are not collapsed: each caller runs
//! its own factory and the last write wins. A computed value is dropped
//! instead of stored when any delete happened while it was being computed,
//! so a read that started before an invalidation cannot put its result
//! back afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use toolcheck_core::cache::{
    deserialize_value, serialize_value, Cache, CacheError, CacheStats, RefreshErrorHandler, Result,
};

use super::LogRefreshErrors;

/// Number of times a refresh-ahead schedule recomputes its key before it
/// cancels itself.
pub const REFRESH_AHEAD_CYCLES: u32 = 3;

struct RefreshSchedule {
    generation: u64,
    handle: JoinHandle<()>,
}

type Schedules = Arc<Mutex<HashMap<String, RefreshSchedule>>>;

/// Orders computed-value writes against deletes.
///
/// `epoch` counts deletes. Deletes bump it and computed values are checked
/// against it while `commit` is held, so a check that passes is never
/// followed by a delete the writer did not see.
#[derive(Clone, Default)]
struct DeleteEpoch {
    epoch: Arc<AtomicU64>,
    commit: Arc<AsyncMutex<()>>,
}

impl DeleteEpoch {
    fn current(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// A typed, TTL-bound view over a cache backend.
pub struct CacheStore<C: Cache> {
    cache: Arc<C>,
    ttl: Duration,
    schedules: Schedules,
    deletes: DeleteEpoch,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    error_handler: Arc<dyn RefreshErrorHandler>,
}

impl<C: Cache + 'static> CacheStore<C> {
    /// Creates a store writing every entry with `ttl`.
    ///
    /// Refresh failures are logged until another handler is installed with
    /// [`CacheStore::with_error_handler`].
    pub fn new(cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            schedules: Arc::new(Mutex::new(HashMap::new())),
            deletes: DeleteEpoch::default(),
            next_generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            error_handler: Arc::new(LogRefreshErrors),
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn RefreshErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The handler detached refresh work reports failures to.
    pub fn error_handler(&self) -> Arc<dyn RefreshErrorHandler> {
        Arc::clone(&self.error_handler)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Gets a cached value. Expired, missing and undecodable entries are all
    /// reported as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lookup(key).await;
        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Stores `value` under `key`, replacing any previous value and
    /// restarting its TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        match serialize_value(value) {
            Ok(bytes) => self.store_bytes(key, bytes).await,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Failed to encode cache value");
            }
        }
    }

    /// Removes `key` and cancels any refresh-ahead schedule for it.
    ///
    /// Values still being computed by `get_or_create*` or a refresh-ahead
    /// cycle are not cached once they finish.
    pub async fn delete(&self, key: &str) {
        self.cancel_refresh(key);
        let _commit = self.deletes.commit.lock().await;
        self.deletes.epoch.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.cache.delete(key).await {
            tracing::warn!(key = %key, error = %err, "Failed to delete cache entry");
        }
    }

    /// Returns the cached value for `key`, or runs `factory`, caches its
    /// result and returns it.
    ///
    /// A factory error is returned as is and nothing is cached.
    pub async fn get_or_create<T, E, F>(&self, key: &str, factory: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let epoch = self.deletes.current();
        if let Some(value) = self.get(key).await {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(value);
        }

        tracing::trace!(key = %key, "Cache miss");
        let value = factory()?;
        self.set_if_unchanged(key, &value, epoch).await;
        Ok(value)
    }

    /// Async counterpart of [`CacheStore::get_or_create`].
    pub async fn get_or_create_async<T, E, F, Fut>(
        &self,
        key: &str,
        factory: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let epoch = self.deletes.current();
        if let Some(value) = self.get(key).await {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(value);
        }

        tracing::trace!(key = %key, "Cache miss");
        let value = factory().await?;
        self.set_if_unchanged(key, &value, epoch).await;
        Ok(value)
    }

    /// Recomputes `key` with `factory` every `interval`, for
    /// [`REFRESH_AHEAD_CYCLES`] cycles.
    ///
    /// Scheduling a key that already has a schedule aborts the old one, so
    /// there is at most one schedule per key. Factory failures go to the
    /// error handler and the schedule carries on with its next cycle.
    ///
    /// # Errors
    ///
    /// Fails when called outside a Tokio runtime.
    pub fn refresh_ahead<T, E, F, Fut>(&self, key: &str, factory: F, interval: Duration) -> Result<()>
    where
        T: Serialize + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CacheError::OperationFailed(format!("refresh-ahead needs a runtime: {e}")))?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cache = Arc::clone(&self.cache);
        let schedules = Arc::clone(&self.schedules);
        let deletes = self.deletes.clone();
        let handler = Arc::clone(&self.error_handler);
        let ttl = self.ttl;
        let task_key = key.to_string();

        // Held while spawning so the task cannot finish and clean up before
        // its schedule is registered.
        let Ok(mut active) = self.schedules.lock() else {
            return Err(CacheError::OperationFailed(
                "refresh schedule lock poisoned".to_string(),
            ));
        };

        let handle = runtime.spawn(async move {
            for cycle in 1..=REFRESH_AHEAD_CYCLES {
                tokio::time::sleep(interval).await;
                let epoch = deletes.current();
                let bytes = match factory().await {
                    Ok(value) => match serialize_value(&value) {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            handler.on_refresh_error(&task_key, &err);
                            continue;
                        }
                    },
                    Err(err) => {
                        handler.on_refresh_error(&task_key, &err);
                        continue;
                    }
                };

                let _commit = deletes.commit.lock().await;
                if deletes.current() != epoch {
                    tracing::trace!(key = %task_key, cycle, "Dropped refresh computed before a delete");
                    continue;
                }
                if let Err(err) = cache.set(&task_key, &bytes, Some(ttl)).await {
                    handler.on_refresh_error(&task_key, &err);
                } else {
                    tracing::trace!(key = %task_key, cycle, "Refreshed ahead");
                }
            }

            if let Ok(mut active) = schedules.lock() {
                if active
                    .get(&task_key)
                    .is_some_and(|s| s.generation == generation)
                {
                    active.remove(&task_key);
                }
            }
        });

        if let Some(previous) = active.insert(key.to_string(), RefreshSchedule { generation, handle }) {
            previous.handle.abort();
            tracing::debug!(key = %key, "Replaced refresh-ahead schedule");
        }
        Ok(())
    }

    /// Aborts the refresh-ahead schedule for `key`. Returns true if one was
    /// active.
    pub fn cancel_refresh(&self, key: &str) -> bool {
        let Ok(mut active) = self.schedules.lock() else {
            return false;
        };
        match active.remove(key) {
            Some(schedule) => {
                schedule.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of refresh-ahead schedules still running.
    pub fn scheduled_refreshes(&self) -> usize {
        self.schedules.lock().map(|active| active.len()).unwrap_or(0)
    }

    /// Stores `value` unless a delete happened since `epoch` was read.
    async fn set_if_unchanged<T: Serialize>(&self, key: &str, value: &T, epoch: u64) {
        let _commit = self.deletes.commit.lock().await;
        if self.deletes.current() != epoch {
            tracing::trace!(key = %key, "Dropped value computed before a delete");
            return;
        }
        self.set(key, value).await;
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match deserialize_value(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    // Treat as a miss; the next write replaces the entry.
                    tracing::warn!(key = %key, error = %err, "Cache value deserialization failed");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Cache lookup failed");
                None
            }
        }
    }

    async fn store_bytes(&self, key: &str, bytes: Vec<u8>) {
        if let Err(err) = self.cache.set(key, &bytes, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %err, "Failed to write cache entry");
        }
    }
}

impl<C: Cache> Drop for CacheStore<C> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.schedules.lock() {
            for (_, schedule) in active.drain() {
                schedule.handle.abort();
            }
        }
    }
}
