//! Application state with cached repositories.
//!
//! One [`CachedRepository`] per entity type, each with its own cache
//! backend, built once at startup and shared through [`AppState`]. The
//! storage backend is selected at compile time via feature flags.

use std::sync::Arc;

use toolcheck_core::inventory::{
    Checkin, ConditionType, Entity, Image, Personnel, Project, StatusType, Tool,
    ToolRepairRequest, ToolRequest, User,
};

use crate::cache::MemoryCache;
use crate::config::Config;
use crate::storage::CachedRepository;

#[cfg(feature = "inmemory")]
pub type Backend<T> = crate::storage::InMemoryRepository<T>;

#[cfg(feature = "sqlite")]
pub type Backend<T> = crate::storage::SqliteRepository<T>;

/// A cached repository over the active backend.
pub type Cached<T> = CachedRepository<T, Backend<T>, MemoryCache>;

/// The cached repositories of every entity type.
pub struct Repositories {
    pub tools: Arc<Cached<Tool>>,
    pub projects: Arc<Cached<Project>>,
    pub personnel: Arc<Cached<Personnel>>,
    pub checkins: Arc<Cached<Checkin>>,
    pub users: Arc<Cached<User>>,
    pub images: Arc<Cached<Image>>,
    pub tool_requests: Arc<Cached<ToolRequest>>,
    pub tool_repair_requests: Arc<Cached<ToolRepairRequest>>,
    pub condition_types: Arc<Cached<ConditionType>>,
    pub status_types: Arc<Cached<StatusType>>,
}

/// Wraps `backend` with its own cache sized and timed from `config`.
fn cached<T: Entity>(backend: Backend<T>, config: &Config) -> anyhow::Result<Arc<Cached<T>>> {
    let cache = Arc::new(MemoryCache::new(config.cache_max_entries)?);
    let repository = CachedRepository::new(Arc::new(backend), cache, config.cache_ttl())
        .with_refresh_mode(config.refresh_mode);
    Ok(Arc::new(repository))
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repositories: Arc<Repositories>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let repositories = Repositories::new(&config).await?;
        Ok(Self {
            repositories: Arc::new(repositories),
            config,
        })
    }
}

// ============================================================================
// Factory functions for each storage backend
// ============================================================================

#[cfg(feature = "inmemory")]
mod inmemory {
    use super::*;
    use toolcheck_core::inventory::{
        seed_condition_types, seed_personnel, seed_projects, seed_status_types, seed_tools,
    };
    use toolcheck_core::storage::{Items, Repository};

    /// Number of tools the in-memory backend starts with.
    pub const DEMO_TOOL_COUNT: usize = 24;

    async fn seeded<T: Entity>(records: Vec<T>) -> anyhow::Result<Backend<T>> {
        let backend = Backend::<T>::new();
        if !records.is_empty() {
            backend.insert(Items::many(records)).await?;
        }
        Ok(backend)
    }

    impl Repositories {
        /// Creates in-memory repositories seeded with demo data.
        pub async fn new(config: &Config) -> anyhow::Result<Self> {
            Self::in_memory(config).await
        }

        pub async fn in_memory(config: &Config) -> anyhow::Result<Self> {
            let repositories = Self {
                tools: cached(seeded(seed_tools(DEMO_TOOL_COUNT)).await?, config)?,
                projects: cached(seeded(seed_projects()).await?, config)?,
                personnel: cached(seeded(seed_personnel()).await?, config)?,
                checkins: cached(Backend::new(), config)?,
                users: cached(Backend::new(), config)?,
                images: cached(Backend::new(), config)?,
                tool_requests: cached(Backend::new(), config)?,
                tool_repair_requests: cached(Backend::new(), config)?,
                condition_types: cached(seeded(seed_condition_types()).await?, config)?,
                status_types: cached(seeded(seed_status_types()).await?, config)?,
            };
            tracing::info!(
                tools = DEMO_TOOL_COUNT,
                refresh_mode = %config.refresh_mode,
                "In-memory repositories ready"
            );
            Ok(repositories)
        }
    }
}

#[cfg(feature = "inmemory")]
pub use inmemory::DEMO_TOOL_COUNT;

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use crate::storage::sqlite::open;

    impl Repositories {
        /// Creates repositories over the SQLite database at
        /// `config.sqlite_path`, creating missing tables.
        pub async fn new(config: &Config) -> anyhow::Result<Self> {
            let conn = open(&config.sqlite_path).await?;

            let repositories = Self {
                tools: cached(Backend::new(conn.clone()).await?, config)?,
                projects: cached(Backend::new(conn.clone()).await?, config)?,
                personnel: cached(Backend::new(conn.clone()).await?, config)?,
                checkins: cached(Backend::new(conn.clone()).await?, config)?,
                users: cached(Backend::new(conn.clone()).await?, config)?,
                images: cached(Backend::new(conn.clone()).await?, config)?,
                tool_requests: cached(Backend::new(conn.clone()).await?, config)?,
                tool_repair_requests: cached(Backend::new(conn.clone()).await?, config)?,
                condition_types: cached(Backend::new(conn.clone()).await?, config)?,
                status_types: cached(Backend::new(conn).await?, config)?,
            };
            tracing::info!(path = %config.sqlite_path, "SQLite repositories ready");
            Ok(repositories)
        }
    }
}
