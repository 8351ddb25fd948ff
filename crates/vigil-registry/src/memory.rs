//! In-memory implementation of the registry contract.
//!
//! # Purpose
//! Implements [`Registry`] entirely in process using `HashMap`s guarded by a
//! mutex. It exists for:
//! - local development and tests (no external dependencies)
//! - exercising control-plane semantics without a store deployment
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: operations are serialized by the lock,
//!   so each call observes the effects of every completed call before it.
//!
//! # Expiry
//! Expiry is lazy: a key past its deadline is removed the next time any
//! operation touches it. `ttl` reports remaining whole seconds.
use super::{Registry, RegistryError, RegistryResult};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// One table per value shape, mirroring the typed keyspace of the real store.
#[derive(Debug, Default)]
struct Tables {
    strings: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, Vec<String>>,
    // Expiry deadlines, keyed alongside whichever table holds the value.
    deadlines: HashMap<String, Instant>,
}

impl Tables {
    fn remove(&mut self, key: &str) {
        self.strings.remove(key);
        self.sets.remove(key);
        self.hashes.remove(key);
        self.lists.remove(key);
        self.deadlines.remove(key);
    }

    // Lazy expiry: drop the key if its deadline has passed.
    fn purge_expired(&mut self, key: &str) {
        let expired = self
            .deadlines
            .get(key)
            .is_some_and(|deadline| *deadline <= Instant::now());
        if expired {
            self.remove(key);
        }
    }

    fn holds(&self, key: &str) -> bool {
        self.strings.contains_key(key)
            || self.sets.contains_key(key)
            || self.hashes.contains_key(key)
            || self.lists.contains_key(key)
    }

    fn remove_all(&mut self) {
        self.strings.clear();
        self.sets.clear();
        self.hashes.clear();
        self.lists.clear();
        self.deadlines.clear();
    }
}

/// In-process registry backend.
///
/// Cheap to share behind an `Arc`; the connectivity flag can be toggled to
/// simulate a lost store connection.
#[derive(Debug)]
pub struct MemoryRegistry {
    tables: Mutex<Tables>,
    connected: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            connected: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("registry lock")
    }

    fn ensure_connected(&self) -> RegistryResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RegistryError::Disconnected)
        }
    }

    /// Simulate losing or regaining the store connection.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Seed a hash field. The control plane only reads hashes; the rest of
    /// the platform (and tests) write them.
    pub fn hset(&self, key: &str, field: &str, value: &str) {
        let mut tables = self.lock();
        tables.purge_expired(key);
        tables
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    /// Remove a hash field, dropping the hash when it empties.
    pub fn hdel(&self, key: &str, field: &str) {
        let mut tables = self.lock();
        if let Some(hash) = tables.hashes.get_mut(key) {
            hash.remove(field);
            if hash.is_empty() {
                tables.hashes.remove(key);
            }
        }
    }

    /// Append to a list. The control plane only reads lists.
    pub fn rpush(&self, key: &str, value: &str) {
        let mut tables = self.lock();
        tables.purge_expired(key);
        tables
            .lists
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get(&self, key: &str) -> RegistryResult<Option<String>> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        Ok(tables.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> RegistryResult<()> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        // A plain SET replaces whatever lived at the key and clears any TTL.
        tables.remove(key);
        tables.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> RegistryResult<()> {
        self.ensure_connected()?;
        self.lock().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> RegistryResult<bool> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        Ok(tables.holds(key))
    }

    async fn expire(&self, key: &str, seconds: u64) -> RegistryResult<()> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        if tables.holds(key) {
            tables
                .deadlines
                .insert(key.to_string(), Instant::now() + Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> RegistryResult<i64> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        if !tables.holds(key) {
            return Ok(-2);
        }
        match tables.deadlines.get(key) {
            Some(deadline) => Ok(deadline.saturating_duration_since(Instant::now()).as_secs() as i64),
            None => Ok(-1),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> RegistryResult<()> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        tables
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> RegistryResult<()> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        if let Some(set) = tables.sets.get_mut(key) {
            set.remove(member);
            // An emptied set disappears, so membership checks stay accurate.
            if set.is_empty() {
                tables.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> RegistryResult<Vec<String>> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        Ok(tables
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hgetall(&self, key: &str) -> RegistryResult<HashMap<String, String>> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        Ok(tables.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> RegistryResult<Vec<String>> {
        self.ensure_connected()?;
        let mut tables = self.lock();
        tables.purge_expired(key);
        let Some(list) = tables.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as i64;
        let resolve = |index: i64| -> i64 {
            if index < 0 { len + index } else { index }
        };
        let start = resolve(start).max(0);
        let stop = resolve(stop).min(len - 1);
        if start > stop || len == 0 {
            return Ok(Vec::new());
        }
        Ok(list[start as usize..=stop as usize].to_vec())
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.lock().remove_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_roundtrip() {
        let registry = MemoryRegistry::new();
        registry.set("client:web-01", "{}").await.expect("set");
        assert_eq!(
            registry.get("client:web-01").await.expect("get"),
            Some("{}".to_string())
        );
        assert!(registry.exists("client:web-01").await.expect("exists"));
        registry.del("client:web-01").await.expect("del");
        assert_eq!(registry.get("client:web-01").await.expect("get"), None);
    }

    #[tokio::test]
    async fn ttl_reports_missing_unset_and_remaining() {
        let registry = MemoryRegistry::new();
        assert_eq!(registry.ttl("nope").await.expect("ttl"), -2);

        registry.set("stash:silence/web", "{}").await.expect("set");
        assert_eq!(registry.ttl("stash:silence/web").await.expect("ttl"), -1);

        registry.expire("stash:silence/web", 60).await.expect("expire");
        let remaining = registry.ttl("stash:silence/web").await.expect("ttl");
        assert!((0..=60).contains(&remaining));
    }

    #[tokio::test]
    async fn expired_keys_vanish_lazily() {
        let registry = MemoryRegistry::new();
        registry.set("stash:tmp", "{}").await.expect("set");
        registry.expire("stash:tmp", 0).await.expect("expire");
        assert!(!registry.exists("stash:tmp").await.expect("exists"));
        assert_eq!(registry.ttl("stash:tmp").await.expect("ttl"), -2);
    }

    #[tokio::test]
    async fn set_replaces_value_and_clears_ttl() {
        let registry = MemoryRegistry::new();
        registry.set("stash:tmp", "1").await.expect("set");
        registry.expire("stash:tmp", 60).await.expect("expire");
        registry.set("stash:tmp", "2").await.expect("set");
        assert_eq!(registry.ttl("stash:tmp").await.expect("ttl"), -1);
        assert_eq!(
            registry.get("stash:tmp").await.expect("get"),
            Some("2".to_string())
        );
    }

    #[tokio::test]
    async fn emptied_sets_disappear() {
        let registry = MemoryRegistry::new();
        registry.sadd("clients", "web-01").await.expect("sadd");
        registry.srem("clients", "web-01").await.expect("srem");
        assert!(!registry.exists("clients").await.expect("exists"));
        assert!(registry.smembers("clients").await.expect("smembers").is_empty());
    }

    #[tokio::test]
    async fn lrange_supports_negative_indices() {
        let registry = MemoryRegistry::new();
        for status in ["0", "1", "2", "0"] {
            registry.rpush("history:web-01:cpu", status);
        }
        let tail = registry
            .lrange("history:web-01:cpu", -2, -1)
            .await
            .expect("lrange");
        assert_eq!(tail, vec!["2".to_string(), "0".to_string()]);

        let all = registry
            .lrange("history:web-01:cpu", -21, -1)
            .await
            .expect("lrange");
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn hashes_seed_and_clear() {
        let registry = MemoryRegistry::new();
        registry.hset("events:db-7", "disk", "{}");
        let events = registry.hgetall("events:db-7").await.expect("hgetall");
        assert_eq!(events.len(), 1);

        registry.hdel("events:db-7", "disk");
        assert!(registry.hgetall("events:db-7").await.expect("hgetall").is_empty());
        assert!(!registry.exists("events:db-7").await.expect("exists"));
    }

    #[tokio::test]
    async fn disconnected_operations_fail() {
        let registry = MemoryRegistry::new();
        registry.set_connected(false);
        assert!(!registry.connected());
        assert!(matches!(
            registry.get("clients").await,
            Err(RegistryError::Disconnected)
        ));
    }
}
