use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared in-memory response cache with a fixed TTL.
///
/// Clones share the same entries, so a cache held by a cloned `ApiService`
/// inside a spawned task fills the same map the UI-side service reads.
/// When `enable_metrics` is set, each operation emits a `tracing::debug!`
/// event with its elapsed time.
pub struct Cache<K, V> {
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    ttl: Duration,
    enable_metrics: bool,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, enable_metrics: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            enable_metrics,
        }
    }

    /// Returns a clone of the value when present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let start = Instant::now();
        let entries = self.entries.read().ok()?;

        let hit = entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone());

        if self.enable_metrics {
            tracing::debug!(elapsed = ?start.elapsed(), hit = hit.is_some(), "cache.get");
        }
        hit
    }

    pub fn set(&self, key: K, value: V) {
        let start = Instant::now();
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(
                    key,
                    CacheEntry {
                        value,
                        expires_at: Instant::now() + self.ttl,
                    },
                );
                if self.enable_metrics {
                    tracing::debug!(elapsed = ?start.elapsed(), "cache.set");
                }
            }
            Err(_) => tracing::warn!("cache.set skipped (lock poisoned)"),
        }
    }

    /// Drops one entry so the next lookup goes to the network.
    pub fn invalidate(&self, key: &K) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
            if self.enable_metrics {
                tracing::debug!(remaining = entries.len(), "cache.invalidate");
            }
        }
    }
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
            enable_metrics: self.enable_metrics,
        }
    }
}
