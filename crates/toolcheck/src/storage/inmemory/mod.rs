//! In-memory storage backend.
//!
//! Stores every record in a `BTreeMap` wrapped in `Arc<RwLock<_>>`. Used by
//! the default build, the CLI demo and the test suites.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolcheck::storage::inmemory::InMemoryRepository;
//! use toolcheck_core::inventory::Tool;
//!
//! let repo = InMemoryRepository::<Tool>::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
