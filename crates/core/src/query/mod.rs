//! Serializable query descriptors.
//!
//! A [`Query`] describes which records a read returns and in what order. It
//! is plain data, so it can be compared, printed into a cache key and replayed
//! later to recompute a cached result.

mod evaluate;
mod types;

pub use evaluate::{compare_values, lookup};
pub use types::{Filter, FilterOp, Query, SortDirection, SortKey};
