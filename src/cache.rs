//! Process-local, time-boxed cache of gateway response bodies.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// How a single gateway call interacts with the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a live entry if present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then store the fresh response.
    Refresh,
    /// Always fetch and leave the cache untouched.
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub companies: Duration,
    pub analysis: Duration,
    pub screener: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            companies: Duration::from_secs(3600),
            analysis: Duration::from_secs(600),
            screener: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttls: CacheTtls,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttls: CacheTtls::default(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    map: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let guard = self.map.read().await;
        let entry = guard.get(key)?;
        if Instant::now() <= entry.expires_at {
            Some(entry.body.clone())
        } else {
            None
        }
    }

    pub async fn put(&self, key: &str, body: &str, ttl: Duration) {
        let now = Instant::now();
        let mut guard = self.map.write().await;
        guard.retain(|_, entry| now <= entry.expires_at);
        guard.insert(
            key.to_string(),
            CacheEntry {
                body: body.to_string(),
                expires_at: now + ttl,
            },
        );
    }

    pub async fn clear(&self) {
        self.map.write().await.clear();
    }

    /// Number of stored entries, expired ones included until the next `put`.
    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_is_served_until_ttl_elapses() {
        let cache = ResponseCache::new();
        cache
            .put("http://gw/companies/", "[]", Duration::from_secs(3600))
            .await;

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert_eq!(cache.get("http://gw/companies/").await.as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("http://gw/companies/").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let cache = ResponseCache::new();
        cache
            .put("http://gw/analysis/SNTS", "{\"a\":1}", Duration::from_secs(600))
            .await;

        assert!(cache.get("http://gw/analysis/ORAC").await.is_none());
        assert!(cache.get("http://gw/analysis/SNTS").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn put_prunes_expired_entries() {
        let cache = ResponseCache::new();
        cache.put("old", "1", Duration::from_secs(1)).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.put("new", "2", Duration::from_secs(60)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("new").await.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = ResponseCache::new();
        cache.put("a", "1", Duration::from_secs(60)).await;
        cache.put("b", "2", Duration::from_secs(60)).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
