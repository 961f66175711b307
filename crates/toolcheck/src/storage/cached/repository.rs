//! Cached repository decorator.
//!
//! Wraps any `Repository<T>` with read-through caching and
//! invalidate-then-repopulate on writes.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use toolcheck_core::cache::{cache_key, Cache, KeyRegistry, ReadOperation, ReadRequest};
use toolcheck_core::inventory::Entity;
use toolcheck_core::query::Query;
use toolcheck_core::storage::{
    validate_delete, validate_inserts, validate_page, validate_updates, DeleteTarget,
    EntityUpdate, Items, Page, PageRequest, Repository, RepositoryError, Result,
};

use crate::cache::CacheStore;

/// How registered keys are recomputed after a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshMode {
    /// Spawn the recomputation and return as soon as keys are invalidated.
    #[default]
    Background,
    /// Recompute every key before the write returns.
    Inline,
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "background" => Ok(RefreshMode::Background),
            "inline" => Ok(RefreshMode::Inline),
            other => Err(format!(
                "unknown refresh mode '{other}', expected 'background' or 'inline'"
            )),
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshMode::Background => f.write_str("background"),
            RefreshMode::Inline => f.write_str("inline"),
        }
    }
}

/// Per-call read options.
///
/// `params` are extra values the caller wants reflected in the cache key,
/// e.g. request parameters that shaped the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    pub cached: bool,
    pub params: Option<Value>,
}

impl ReadOptions {
    pub fn cached() -> Self {
        Self {
            cached: true,
            params: None,
        }
    }

    pub fn uncached() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Replays `request` against `repository`, returning the result as JSON.
///
/// The JSON carries the same shape the typed read returns, so it can be
/// written to the cache and decoded later as `Option<T>`, `Vec<T>` or
/// `Page<T>`.
async fn load<T, R>(repository: &R, request: &ReadRequest) -> Result<Value>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    let value = match request.operation {
        ReadOperation::GetEntity => serde_json::to_value(repository.get_entity(&request.query).await?)?,
        ReadOperation::GetById => {
            let id = request.id.ok_or_else(|| {
                RepositoryError::InvalidData("GetById read recorded without an id".to_string())
            })?;
            serde_json::to_value(repository.get_by_id(id).await?)?
        }
        ReadOperation::GetAll => serde_json::to_value(repository.get_all(&request.query).await?)?,
        ReadOperation::GetAllPaged => {
            let page = request.page.ok_or_else(|| {
                RepositoryError::InvalidData("GetAllPaged read recorded without a page".to_string())
            })?;
            serde_json::to_value(repository.get_all_paged(&request.query, page).await?)?
        }
    };
    Ok(value)
}

/// Recomputes every entry in `entries`, reporting failures to the store's
/// error handler.
async fn repopulate<T, R, C>(
    repository: &R,
    store: &CacheStore<C>,
    entries: &[(String, ReadRequest)],
) -> usize
where
    T: Entity,
    R: Repository<T>,
    C: Cache + 'static,
{
    let mut refreshed = 0;
    for (key, request) in entries {
        match load::<T, R>(repository, request).await {
            Ok(value) => {
                store.set(key, &value).await;
                refreshed += 1;
            }
            Err(err) => store.error_handler().on_refresh_error(key, &err),
        }
    }
    tracing::debug!(entity = T::NAME, refreshed, total = entries.len(), "Cache repopulated");
    refreshed
}

/// Cached repository decorator.
///
/// - **Reads**: when cached, derive the key, record it in the key registry
///   and read through the [`CacheStore`]. Uncached reads go straight to the
///   repository.
/// - **Writes**: validate, persist, invalidate every registered key, then
///   recompute them from their recorded reads.
///
/// `Repository::get_by_id` reads through the cache; the other trait reads
/// do not. Use the `*_with` methods to choose per call.
///
/// # Type Parameters
///
/// * `T` - The entity type
/// * `R` - The underlying repository implementation
/// * `C` - The cache backend
pub struct CachedRepository<T, R, C>
where
    T: Entity,
    R: Repository<T>,
    C: Cache,
{
    repository: Arc<R>,
    store: Arc<CacheStore<C>>,
    registry: Arc<RwLock<KeyRegistry>>,
    /// Held while keys are invalidated or recomputed so a slow recompute
    /// from an earlier write cannot land after a later invalidation.
    refresh_lock: Arc<Mutex<()>>,
    mode: RefreshMode,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R, C> CachedRepository<T, R, C>
where
    T: Entity,
    R: Repository<T> + 'static,
    C: Cache + 'static,
{
    /// Creates a new cached repository with its own cache store.
    ///
    /// # Arguments
    ///
    /// * `repository` - The underlying repository to cache
    /// * `cache` - The cache backend
    /// * `ttl` - Time-to-live for every cached read
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self::with_store(repository, Arc::new(CacheStore::new(cache, ttl)))
    }

    /// Creates a cached repository over an existing store.
    pub fn with_store(repository: Arc<R>, store: Arc<CacheStore<C>>) -> Self {
        Self {
            repository,
            store,
            registry: Arc::new(RwLock::new(KeyRegistry::new())),
            refresh_lock: Arc::new(Mutex::new(())),
            mode: RefreshMode::default(),
            _entity: PhantomData,
        }
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.mode
    }

    /// The cache store backing this repository.
    pub fn cache(&self) -> &Arc<CacheStore<C>> {
        &self.store
    }

    /// Every key this repository has issued, sorted.
    pub fn cached_keys(&self) -> Vec<String> {
        match self.registry.read() {
            Ok(registry) => registry.keys(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn get_entity_with(&self, query: &Query, options: ReadOptions) -> Result<Option<T>> {
        if !options.cached {
            return self.repository.get_entity(query).await;
        }
        let request = ReadRequest::entity(query.clone()).with_params(options.params);
        self.read_through(request, || self.repository.get_entity(query))
            .await
    }

    pub async fn get_by_id_with(&self, id: i64, cached: bool) -> Result<Option<T>> {
        if !cached {
            return self.repository.get_by_id(id).await;
        }
        self.read_through(ReadRequest::by_id(id), || self.repository.get_by_id(id))
            .await
    }

    pub async fn get_all_with(&self, query: &Query, options: ReadOptions) -> Result<Vec<T>> {
        if !options.cached {
            return self.repository.get_all(query).await;
        }
        let request = ReadRequest::all(query.clone()).with_params(options.params);
        self.read_through(request, || self.repository.get_all(query))
            .await
    }

    pub async fn get_all_paged_with(
        &self,
        query: &Query,
        page: PageRequest,
        options: ReadOptions,
    ) -> Result<Page<T>> {
        if !options.cached {
            return self.repository.get_all_paged(query, page).await;
        }
        // Rejected here so an invalid page never lands in the registry.
        validate_page(&page)?;
        let request = ReadRequest::paged(query.clone(), page).with_params(options.params);
        self.read_through(request, || self.repository.get_all_paged(query, page))
            .await
    }

    /// Invalidates and recomputes every registered key, waiting for the
    /// recomputation. Returns how many keys were refreshed.
    pub async fn refresh_cache(&self) -> usize {
        let _guard = self.refresh_lock.lock().await;
        let entries = self.invalidate_locked().await;
        repopulate::<T, R, C>(&self.repository, &self.store, &entries).await
    }

    /// Registers `request` and schedules the cache store to recompute it
    /// every `interval` for a bounded number of cycles.
    ///
    /// Returns the cache key the schedule refreshes.
    pub fn refresh_ahead(&self, request: ReadRequest, interval: Duration) -> Result<String> {
        let key = self.register(&request);
        let repository = Arc::clone(&self.repository);

        self.store
            .refresh_ahead(
                &key,
                move || {
                    let repository = Arc::clone(&repository);
                    let request = request.clone();
                    async move { load::<T, R>(repository.as_ref(), &request).await }
                },
                interval,
            )
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        tracing::debug!(entity = T::NAME, key = %key, interval = ?interval, "Scheduled refresh-ahead");
        Ok(key)
    }

    fn register(&self, request: &ReadRequest) -> String {
        let key = cache_key(T::CACHE_PREFIX, request);
        match self.registry.write() {
            Ok(mut registry) => {
                if registry.record(&key, request) {
                    tracing::trace!(entity = T::NAME, key = %key, "Registered cache key");
                }
            }
            Err(_) => {
                tracing::warn!(entity = T::NAME, key = %key, "Key registry lock poisoned");
            }
        }
        key
    }

    async fn read_through<V, F, Fut>(&self, request: ReadRequest, fetch: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let key = self.register(&request);
        self.store.get_or_create_async(&key, fetch).await
    }

    /// Deletes every registered key from the store. Caller holds
    /// `refresh_lock`.
    async fn invalidate_locked(&self) -> Vec<(String, ReadRequest)> {
        let entries = match self.registry.read() {
            Ok(registry) => registry.snapshot(),
            Err(_) => Vec::new(),
        };
        for (key, _) in &entries {
            self.store.delete(key).await;
        }
        tracing::debug!(entity = T::NAME, keys = entries.len(), "Cache invalidated");
        entries
    }

    /// Runs after every successful write.
    async fn invalidate_and_repopulate(&self) {
        let guard = Arc::clone(&self.refresh_lock).lock_owned().await;
        let entries = self.invalidate_locked().await;
        if entries.is_empty() {
            return;
        }

        match self.mode {
            RefreshMode::Inline => {
                repopulate::<T, R, C>(&self.repository, &self.store, &entries).await;
            }
            RefreshMode::Background => {
                let repository = Arc::clone(&self.repository);
                let store = Arc::clone(&self.store);
                // The task keeps the lock until the recompute is done.
                tokio::spawn(async move {
                    let _guard = guard;
                    repopulate::<T, R, C>(&repository, &store, &entries).await;
                });
            }
        }
    }
}

#[async_trait]
impl<T, R, C> Repository<T> for CachedRepository<T, R, C>
where
    T: Entity,
    R: Repository<T> + 'static,
    C: Cache + 'static,
{
    async fn get_entity(&self, query: &Query) -> Result<Option<T>> {
        self.get_entity_with(query, ReadOptions::uncached()).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<T>> {
        self.get_by_id_with(id, true).await
    }

    async fn get_all(&self, query: &Query) -> Result<Vec<T>> {
        self.get_all_with(query, ReadOptions::uncached()).await
    }

    async fn get_all_paged(&self, query: &Query, page: PageRequest) -> Result<Page<T>> {
        self.get_all_paged_with(query, page, ReadOptions::uncached())
            .await
    }

    async fn insert(&self, items: Items<T>) -> Result<Vec<T>> {
        // 1. Validate before touching storage
        validate_inserts(&items)?;

        // 2. Persist
        let inserted = self.repository.insert(items).await?;
        tracing::debug!(entity = T::NAME, count = inserted.len(), "Inserted");

        // 3. Invalidate and recompute cached reads
        self.invalidate_and_repopulate().await;
        Ok(inserted)
    }

    async fn update(&self, updates: Items<EntityUpdate>) -> Result<Vec<T>> {
        validate_updates(&updates)?;

        let updated = self.repository.update(updates).await?;
        tracing::debug!(entity = T::NAME, count = updated.len(), "Updated");

        self.invalidate_and_repopulate().await;
        Ok(updated)
    }

    async fn delete(&self, target: DeleteTarget<T>) -> Result<u64> {
        validate_delete(&target)?;

        let removed = self.repository.delete(target).await?;
        tracing::debug!(entity = T::NAME, removed, "Deleted");

        self.invalidate_and_repopulate().await;
        Ok(removed)
    }
}
