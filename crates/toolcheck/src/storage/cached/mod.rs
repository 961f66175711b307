//! Cached repository decorator.
//!
//! [`CachedRepository`] wraps any `Repository<T>` and implements:
//!
//! - **Reads**: opt-in read-through. The key is derived from the read,
//!   recorded in the repository's key registry and looked up in its
//!   [`crate::cache::CacheStore`]; on a miss the underlying repository is
//!   called and the result cached.
//! - **Writes**: validate, persist, invalidate every registered key, then
//!   recompute those keys from the reads that produced them.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let repo = Arc::new(InMemoryRepository::<Tool>::new());
//! let cache = Arc::new(MemoryCache::new(10_000)?);
//!
//! let tools = CachedRepository::new(repo, cache, Duration::from_secs(300))
//!     .with_refresh_mode(RefreshMode::Inline);
//! let page = tools
//!     .get_all_paged_with(&Query::all(), PageRequest::new(1, 10), ReadOptions::cached())
//!     .await?;
//! ```

mod repository;

pub use repository::{CachedRepository, ReadOptions, RefreshMode};
