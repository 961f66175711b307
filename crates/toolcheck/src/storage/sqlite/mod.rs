//! SQLite storage backend implementation.
//!
//! One table per entity type, each row holding the entity's JSON document
//! next to its integer id. Built on `rusqlite` with `tokio-rusqlite` for the
//! async wrapping. All repositories share one [`Connection`].

mod error;
mod repository;
mod schema;

pub use repository::{open, open_in_memory, SqliteRepository};
pub use tokio_rusqlite::Connection;
