use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Trait for basic cache operations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache by key. Expired values are absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value in the cache with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value from the cache by key.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Receives failures from cache work that runs detached from any caller:
/// refresh-ahead ticks and repopulation after writes.
pub trait RefreshErrorHandler: Send + Sync {
    fn on_refresh_error(&self, key: &str, error: &(dyn std::error::Error + Send + Sync));
}
