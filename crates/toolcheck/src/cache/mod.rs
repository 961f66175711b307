//! Cache backend and cache store.
//!
//! [`MemoryCache`] is the byte-level backend; [`CacheStore`] layers typed
//! values, TTL, read-through and refresh-ahead on top of any
//! [`toolcheck_core::cache::Cache`].

pub mod memory;
mod store;

pub use memory::MemoryCache;
pub use store::{CacheStore, REFRESH_AHEAD_CYCLES};

use toolcheck_core::cache::RefreshErrorHandler;

/// Reports detached refresh failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRefreshErrors;

impl RefreshErrorHandler for LogRefreshErrors {
    fn on_refresh_error(&self, key: &str, error: &(dyn std::error::Error + Send + Sync)) {
        tracing::warn!(key = %key, error = %error, "Cache refresh failed");
    }
}
