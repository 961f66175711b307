//! Imperative shell of toolcheck.
//!
//! Cache backend and cache store, the cached repository decorator, storage
//! backends, configuration and application wiring. Pure logic lives in
//! `toolcheck_core`.

pub mod cache;
pub mod cli;
pub mod config;
pub mod state;
pub mod storage;
