use std::{env, time::Duration};

use crate::storage::RefreshMode;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of entries per entity cache (default: 10,000)
    pub cache_max_entries: usize,
    /// How cached reads are recomputed after a write (default: background)
    pub refresh_mode: RefreshMode,
    /// Path to SQLite database file (default: "toolcheck.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    pub sqlite_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `CACHE_REFRESH_MODE` - `background` or `inline` (default: background)
    /// - `SQLITE_PATH` - SQLite database path (default: "toolcheck.db")
    pub fn from_env() -> Self {
        Self {
            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            refresh_mode: env::var("CACHE_REFRESH_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "toolcheck.db".to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
