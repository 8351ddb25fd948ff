//! Registry client contract for the Vigil control plane.
//!
//! # Purpose
//! The registry is the shared key/value store that holds all persisted fleet
//! state (clients, events, results, aggregates, stashes). This crate defines
//! the asynchronous subset of operations the control plane relies on, plus an
//! in-memory backend for local development and tests.
//!
//! # Key invariants and assumptions
//! - Keys are plain strings; values are opaque strings (the control plane
//!   stores serialized JSON).
//! - Set members and hash fields are strings.
//! - `ttl` follows the usual store convention: `-2` for a missing key, `-1`
//!   for a key without an expiry, otherwise remaining seconds.
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryRegistry;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not connected to the registry")]
    Disconnected,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Asynchronous facade over the key/value store backing the control plane.
///
/// Implementations must be safe to share across request handlers; every
/// operation suspends until the store has acknowledged it.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn get(&self, key: &str) -> RegistryResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> RegistryResult<()>;
    async fn del(&self, key: &str) -> RegistryResult<()>;
    async fn exists(&self, key: &str) -> RegistryResult<bool>;
    async fn expire(&self, key: &str, seconds: u64) -> RegistryResult<()>;
    async fn ttl(&self, key: &str) -> RegistryResult<i64>;

    async fn sadd(&self, key: &str, member: &str) -> RegistryResult<()>;
    async fn srem(&self, key: &str, member: &str) -> RegistryResult<()>;
    async fn smembers(&self, key: &str) -> RegistryResult<Vec<String>>;

    async fn hgetall(&self, key: &str) -> RegistryResult<HashMap<String, String>>;

    /// Inclusive range over a list; negative indices count from the tail.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> RegistryResult<Vec<String>>;

    fn connected(&self) -> bool;
    async fn close(&self);
}
