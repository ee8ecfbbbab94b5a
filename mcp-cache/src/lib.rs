//! Multi-level cache: bounded L1 LRU over a distributed L2 KV store
//! (spec §4.C).
//!
//! Read policy: L1 → L2 → absent, backfilling L1 on an L2 hit. Write
//! policy: write-through to both tiers. `invalidate` clears the
//! matching L1 entries and issues a pattern delete against L2.

use lru::LruCache;
use mcp_config::CacheConfig;
use mcp_storage::KvStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    L1,
    L2,
    Miss,
}

struct L1Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Bounded LRU guarded by a single lock. Hold time per operation is
/// O(1): a map lookup/insert plus an eviction, never a scan.
struct L1Cache {
    entries: Mutex<LruCache<String, L1Entry>>,
    ttl: Duration,
}

impl L1Cache {
    fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { entries: Mutex::new(LruCache::new(cap)), ttl }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: String, value: Vec<u8>, ttl_override: Option<Duration>) {
        let ttl = ttl_override.unwrap_or(self.ttl);
        self.entries.lock().put(key, L1Entry { value, expires_at: Instant::now() + ttl });
    }

    fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock();
        let stale: Vec<String> = entries.iter().map(|(k, _)| k.clone()).filter(|k| k.starts_with(prefix)).collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    fn invalidate_key(&self, key: &str) {
        self.entries.lock().pop(key);
    }
}

/// Multi-level cache facade. One [`L1Cache`] shard backs the whole
/// process; categories are namespaced by key prefix.
pub struct MultiLevelCache {
    l1: L1Cache,
    l2: Arc<dyn KvStore>,
    category_ttl: HashMap<String, Duration>,
    last_l2_warning: Mutex<Option<Instant>>,
}

impl MultiLevelCache {
    pub fn new(config: &CacheConfig, l2: Arc<dyn KvStore>) -> Self {
        let category_ttl =
            config.category_ttl_s.iter().map(|(k, v)| (k.clone(), Duration::from_secs(*v))).collect();
        Self {
            l1: L1Cache::new(config.l1_capacity, Duration::from_secs(config.l1_ttl_s)),
            l2,
            category_ttl,
            last_l2_warning: Mutex::new(None),
        }
    }

    fn namespaced(&self, category: &str, key: &str) -> String {
        format!("{category}:{key}")
    }

    fn ttl_for(&self, category: &str) -> Duration {
        self.category_ttl.get(category).copied().unwrap_or(Duration::from_secs(60))
    }

    /// Logs an L2-unreachable warning at most once per 60 seconds.
    fn warn_l2_unreachable(&self, err: &mcp_storage::StorageError) {
        let now = Instant::now();
        let mut last = self.last_l2_warning.lock();
        if last.is_none_or(|t| now.duration_since(t) >= Duration::from_secs(60)) {
            *last = Some(now);
            warn!(error = %err, "L2 cache unreachable, serving L1 only");
        }
    }

    pub async fn get(&self, category: &str, key: &str) -> (Option<Vec<u8>>, HitTier) {
        let namespaced = self.namespaced(category, key);

        if let Some(value) = self.l1.get(&namespaced) {
            return (Some(value), HitTier::L1);
        }

        match self.l2.get(&namespaced).await {
            Ok(Some(value)) => {
                self.l1.set(namespaced, value.clone(), None);
                (Some(value), HitTier::L2)
            }
            Ok(None) => (None, HitTier::Miss),
            Err(err) => {
                self.warn_l2_unreachable(&err);
                (None, HitTier::Miss)
            }
        }
    }

    pub async fn set(&self, category: &str, key: &str, value: Vec<u8>) {
        let namespaced = self.namespaced(category, key);
        let ttl = self.ttl_for(category);
        self.l1.set(namespaced.clone(), value.clone(), Some(ttl));
        if let Err(err) = self.l2.setex(&namespaced, ttl, value).await {
            self.warn_l2_unreachable(&err);
        }
    }

    pub async fn invalidate_category(&self, category: &str) {
        let prefix = format!("{category}:");
        self.l1.invalidate_prefix(&prefix);
        if let Err(err) = self.l2.del_pattern(&format!("{prefix}*")).await {
            self.warn_l2_unreachable(&err);
        }
    }

    pub async fn invalidate_key(&self, category: &str, key: &str) {
        let namespaced = self.namespaced(category, key);
        self.l1.invalidate_key(&namespaced);
        if let Err(err) = self.l2.del(&namespaced).await {
            self.warn_l2_unreachable(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_storage::InMemoryKvStore;

    fn cache() -> MultiLevelCache {
        MultiLevelCache::new(&CacheConfig::default(), Arc::new(InMemoryKvStore::new()))
    }

    #[tokio::test]
    async fn set_then_get_hits_l1() {
        let cache = cache();
        cache.set("tool_catalog", "k", b"v".to_vec()).await;
        let (value, tier) = cache.get("tool_catalog", "k").await;
        assert_eq!(value, Some(b"v".to_vec()));
        assert_eq!(tier, HitTier::L1);
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = cache();
        let (value, tier) = cache.get("tool_catalog", "missing").await;
        assert_eq!(value, None);
        assert_eq!(tier, HitTier::Miss);
    }

    #[tokio::test]
    async fn l2_hit_backfills_l1() {
        let l2 = Arc::new(InMemoryKvStore::new());
        l2.setex("tool_catalog:k", Duration::from_secs(60), b"from-l2".to_vec()).await.unwrap();
        let cache = MultiLevelCache::new(&CacheConfig::default(), l2);

        let (value, tier) = cache.get("tool_catalog", "k").await;
        assert_eq!(value, Some(b"from-l2".to_vec()));
        assert_eq!(tier, HitTier::L2);

        let (value, tier) = cache.get("tool_catalog", "k").await;
        assert_eq!(value, Some(b"from-l2".to_vec()));
        assert_eq!(tier, HitTier::L1);
    }

    #[tokio::test]
    async fn invalidate_category_clears_both_tiers() {
        let cache = cache();
        cache.set("db_query", "a", b"1".to_vec()).await;
        cache.set("db_query", "b", b"2".to_vec()).await;
        cache.invalidate_category("db_query").await;
        assert_eq!(cache.get("db_query", "a").await.1, HitTier::Miss);
        assert_eq!(cache.get("db_query", "b").await.1, HitTier::Miss);
    }

    #[tokio::test]
    async fn invalidate_key_leaves_siblings_intact() {
        let cache = cache();
        cache.set("db_query", "a", b"1".to_vec()).await;
        cache.set("db_query", "b", b"2".to_vec()).await;
        cache.invalidate_key("db_query", "a").await;
        assert_eq!(cache.get("db_query", "a").await.1, HitTier::Miss);
        assert_eq!(cache.get("db_query", "b").await.0, Some(b"2".to_vec()));
    }
}
