//! Concurrent TTL cache with sliding expiration.
//!
//! One coarse lock guards the whole map. The critical sections are plain map
//! operations and the lock is never held across an `.await` or any I/O, so
//! contention stays bounded even though every request path goes through it.
//! Parallel-write throughput is deliberately traded for correctness at
//! low-to-moderate concurrency.
//!
//! Expiration is *sliding*: every successful read refreshes the entry's
//! `last_access`, so a hot key never expires while it is being served. Cold
//! keys are reclaimed by the janitor within one sweep period after `max_age`
//! of inactivity. Nothing prevents two concurrent misses on the same key from
//! both computing; the second `put` simply wins. That stampede is accepted,
//! not a missing lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

struct CacheEntry {
    value: Value,
    last_access: Instant,
}

/// Shared handle to the result cache.
///
/// Cloning is cheap (an `Arc` bump); every clone sees the same map. The
/// handle is created once at startup and injected into the pipeline rather
/// than living as ambient global state, which keeps tests isolated.
#[derive(Clone, Default)]
pub struct TtlCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key`; a hit refreshes its `last_access` and clones the value
    /// out. Never fails — lock poisoning cannot occur because no panic can
    /// happen inside these critical sections.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut map = self.lock();
        let entry = map.get_mut(key)?;
        entry.last_access = Instant::now();
        Some(entry.value.clone())
    }

    /// Inserts or replaces the entry for `key`. Last writer wins.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug!(%key, "added key to cache");
        self.lock().insert(key, CacheEntry { value, last_access: Instant::now() });
    }

    /// Removes every entry whose last access is older than `max_age`. This is
    /// the only path that deletes entries.
    pub fn sweep(&self, max_age: Duration) {
        let now = Instant::now();
        let mut map = self.lock();
        map.retain(|key, entry| {
            let stale = now.duration_since(entry.last_access) > max_age;
            if stale {
                debug!(%key, "key deleted from cache");
            }
            !stale
        });
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Spawns the janitor: one long-lived task sweeping on a fixed period,
    /// independent of request traffic. The handle lets the caller abort it on
    /// shutdown.
    pub fn spawn_janitor(&self, period: Duration, max_age: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick of an interval fires immediately; skip it so the
            // first sweep happens one full period after startup
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("sweeping cache");
                cache.sweep(max_age);
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // no critical section can panic, so a poisoned lock means a bug we
        // would rather surface than limp past
        self.inner.lock().expect("cache lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get_returns_value() {
        let cache = TtlCache::new();
        cache.put("5", json!(3));
        assert_eq!(cache.get("5"), Some(json!(3)));
        assert_eq!(cache.get("6"), None);
    }

    #[test]
    fn put_replaces_last_writer_wins() {
        let cache = TtlCache::new();
        cache.put("k", json!(1));
        cache.put("k", json!(2));
        assert_eq!(cache.get("k"), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_removes_only_stale_entries() {
        let cache = TtlCache::new();
        cache.put("old", json!(1));
        std::thread::sleep(Duration::from_millis(40));
        cache.put("new", json!(2));
        cache.sweep(Duration::from_millis(25));
        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.get("new"), Some(json!(2)));
    }

    #[test]
    fn read_refreshes_sliding_expiration() {
        let cache = TtlCache::new();
        let max_age = Duration::from_millis(40);
        cache.put("hot", json!(1));
        // read every max_age/2 across several sweep cycles; the entry must
        // survive them all
        for _ in 0..4 {
            std::thread::sleep(max_age / 2);
            assert!(cache.get("hot").is_some(), "hot key expired despite reads");
            cache.sweep(max_age);
        }
        // stop reading; one full max_age later the sweep reclaims it
        std::thread::sleep(max_age + Duration::from_millis(10));
        cache.sweep(max_age);
        assert_eq!(cache.get("hot"), None);
    }

    #[tokio::test]
    async fn janitor_sweeps_in_background() {
        let cache = TtlCache::new();
        cache.put("k", json!(1));
        let janitor =
            cache.spawn_janitor(Duration::from_millis(20), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.is_empty());
        janitor.abort();
    }

    #[test]
    fn clones_share_the_same_map() {
        let a = TtlCache::new();
        let b = a.clone();
        a.put("k", json!("v"));
        assert_eq!(b.get("k"), Some(json!("v")));
    }
}
