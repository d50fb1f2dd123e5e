//! Per-outbound latency stores.
//!
//! # Responsibilities
//! - Create a store the first time a tag is recorded
//! - Look up, enumerate and drop stores by tag
//!
//! # Design Decisions
//! - One lock per store; the map itself is a concurrent `DashMap`
//! - Stores are handed out as `Arc<Mutex<_>>` so readers (admin API) share them

use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::health::stats::Stats;
use crate::health::storage::{LatencyStore, Rtt, Sample};

/// A store shared between the checker and reporting consumers.
pub type SharedStore = Arc<Mutex<LatencyStore>>;

/// Registry of latency stores keyed by outbound tag.
#[derive(Debug)]
pub struct StorageRegistry {
    capacity: usize,
    validity: Duration,
    stores: DashMap<String, SharedStore>,
}

impl StorageRegistry {
    /// Create an empty registry; new stores get `capacity` slots and `validity`.
    pub fn new(capacity: usize, validity: Duration) -> Self {
        Self {
            capacity,
            validity,
            stores: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Return the store of `tag`, creating it if needed.
    pub fn get_or_create(&self, tag: &str) -> SharedStore {
        if let Some(store) = self.stores.get(tag) {
            return store.value().clone();
        }
        self.stores
            .entry(tag.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(LatencyStore::new(self.capacity, self.validity)))
            })
            .clone()
    }

    /// Look up the store of `tag` without creating it.
    pub fn get(&self, tag: &str) -> Option<SharedStore> {
        self.stores.get(tag).map(|r| r.value().clone())
    }

    /// Drop the store of `tag`.
    pub fn delete(&self, tag: &str) {
        if self.stores.remove(tag).is_some() {
            tracing::debug!(outbound = %tag, "Dropped latency history");
        }
    }

    /// All known tags, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.stores.iter().map(|r| r.key().clone()).collect()
    }

    /// Record a sample for `tag`.
    pub fn put(&self, tag: &str, delay: Rtt) {
        let store = self.get_or_create(tag);
        lock(&store).put(delay);
    }

    /// Latest sample of `tag`.
    pub fn latest(&self, tag: &str) -> Option<Sample> {
        let store = self.get(tag)?;
        let latest = lock(&store).latest();
        latest
    }

    /// All samples of `tag`, latest first.
    pub fn all(&self, tag: &str) -> Vec<Sample> {
        let Some(store) = self.get(tag) else {
            return Vec::new();
        };
        let samples = lock(&store).all();
        samples
    }

    /// Current statistics of `tag`; empty for unknown tags.
    pub fn stats(&self, tag: &str) -> Stats {
        let Some(store) = self.get(tag) else {
            return Stats::default();
        };
        let stats = lock(&store).stats();
        stats
    }
}

/// Lock a store, recovering from poisoning; samples stay consistent because
/// every mutation is a single slot write.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, LatencyStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_operations() {
        let registry = StorageRegistry::new(5, Duration::from_secs(60));
        assert!(registry.get("a").is_none());
        assert!(registry.latest("a").is_none());
        assert_eq!(registry.stats("a"), Stats::default());

        registry.put("a", Rtt::Millis(42));
        registry.put("b", Rtt::Failed);

        let mut tags = registry.list();
        tags.sort();
        assert_eq!(tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(registry.latest("a").unwrap().delay, Rtt::Millis(42));
        assert_eq!(registry.stats("b").fail, 1);

        registry.delete("a");
        assert!(registry.get("a").is_none());
        assert_eq!(registry.list(), vec!["b".to_string()]);
    }

    #[test]
    fn test_get_or_create_returns_same_store() {
        let registry = StorageRegistry::new(3, Duration::from_secs(60));
        let first = registry.get_or_create("a");
        let second = registry.get_or_create("a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(lock(&first).capacity(), 3);
    }
}
