//! Storage backend implementations.
//!
//! Concrete implementations of `toolcheck_core::storage::Repository`, plus
//! the caching decorator that wraps them.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): `BTreeMap`-backed repositories, seeded with demo
//!   data by the binary
//! - `sqlite`: SQLite backend using `rusqlite` and `tokio-rusqlite`
//!
//! These features are mutually exclusive - only one storage backend can be
//! enabled at a time.

#[cfg(all(feature = "inmemory", feature = "sqlite"))]
compile_error!(
    "Features 'inmemory' and 'sqlite' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'sqlite' feature. \
    Example: cargo build -p toolcheck --no-default-features --features sqlite"
);

pub mod cached;

// The decorator's tests run against the in-memory backend.
#[cfg(any(feature = "inmemory", test))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::{CachedRepository, ReadOptions, RefreshMode};

#[cfg(any(feature = "inmemory", test))]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
