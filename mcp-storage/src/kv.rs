//! `KvStore`: distributed key-value backend contract (spec §4.B, §4.C's
//! L2 tier).

use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set with an expiry of `ttl` from now.
    async fn setex(&self, key: &str, ttl: Duration, value: Vec<u8>) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    /// Deletes every key matching a `*`-glob style `pattern`.
    async fn del_pattern(&self, pattern: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process fallback used when no `redis` feature backend is
/// configured, or as the L2 double in tests.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn glob_match(pattern: &str, key: &str) -> bool {
        match pattern.split_once('*') {
            None => pattern == key,
            Some((prefix, suffix)) => key.starts_with(prefix) && key.ends_with(suffix),
        }
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn setex(&self, key: &str, ttl: Duration, value: Vec<u8>) -> Result<()> {
        self.entries.lock().insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn del_pattern(&self, pattern: &str) -> Result<u64> {
        let mut entries = self.entries.lock();
        let matched: Vec<String> =
            entries.keys().filter(|k| Self::glob_match(pattern, k)).cloned().collect();
        for key in &matched {
            entries.remove(key);
        }
        Ok(matched.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub type SharedKvStore = Arc<dyn KvStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store = InMemoryKvStore::new();
        store.setex("k", Duration::from_millis(1), b"v".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn del_pattern_matches_prefix_glob() {
        let store = InMemoryKvStore::new();
        store.setex("tool:a", Duration::from_secs(60), b"1".to_vec()).await.unwrap();
        store.setex("tool:b", Duration::from_secs(60), b"2".to_vec()).await.unwrap();
        store.setex("other", Duration::from_secs(60), b"3".to_vec()).await.unwrap();
        let deleted = store.del_pattern("tool:*").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get("other").await.unwrap().is_some());
    }
}
