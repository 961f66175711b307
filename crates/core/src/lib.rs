//! Functional core for toolcheck.
//!
//! Everything in this crate is pure: entity types, query descriptors,
//! pagination, validation, cache key derivation and the traits the
//! imperative shell implements. No I/O happens here.

pub mod cache;
pub mod inventory;
pub mod query;
pub mod storage;
