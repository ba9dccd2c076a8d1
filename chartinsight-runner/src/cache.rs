//! Injected bundle cache.
//!
//! Entries live for a fixed TTL. An expired entry is dropped when its key is
//! looked up, and every insert sweeps the rest, so keys that are never asked
//! for again do not accumulate. Time comes from `tokio::time` so tests can
//! pause and advance the clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chartinsight_core::fingerprint::CacheKey;
use tokio::time::Instant;

use crate::bundle::InsightBundle;

pub trait InsightCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Arc<InsightBundle>>;
    fn insert(&self, key: CacheKey, bundle: Arc<InsightBundle>);
    fn invalidate(&self, key: &CacheKey);
    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    bundle: Arc<InsightBundle>,
    expires_at: Instant,
}

pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        sweep(&mut self.entries(), Instant::now());
    }
}

fn sweep(entries: &mut HashMap<CacheKey, Entry>, now: Instant) {
    entries.retain(|_, e| e.expires_at > now);
}

impl InsightCache for TtlCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<InsightBundle>> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Some(Arc::clone(&e.bundle)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert(&self, key: CacheKey, bundle: Arc<InsightBundle>) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries();
        sweep(&mut entries, now);
        entries.insert(
            key,
            Entry {
                bundle,
                expires_at: now + self.ttl,
            },
        );
    }

    fn invalidate(&self, key: &CacheKey) {
        self.entries().remove(key);
    }

    fn len(&self) -> usize {
        let now = Instant::now();
        self.entries().values().filter(|e| e.expires_at > now).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_bundle;

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new(symbol, "1d", 63, "auto", "abc".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(key("SPY"), Arc::new(sample_bundle("SPY")));
        assert!(cache.get(&key("SPY")).is_some());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&key("SPY")).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&key("SPY")).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_isolated() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(key("SPY"), Arc::new(sample_bundle("SPY")));
        assert!(cache.get(&key("QQQ")).is_none());
        cache.invalidate(&key("SPY"));
        assert!(cache.get(&key("SPY")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_disables_caching() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(key("SPY"), Arc::new(sample_bundle("SPY")));
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_keys_are_swept_on_insert() {
        let cache = TtlCache::new(Duration::from_secs(60));
        for i in 0..500 {
            let hashed = CacheKey::new("SPY", "1d", 63, "auto", format!("bar-{i}"));
            cache.insert(hashed, Arc::new(sample_bundle("SPY")));
            assert_eq!(cache.entries().len(), 1);
            tokio::time::advance(Duration::from_secs(61)).await;
        }
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_keeps_live_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(key("SPY"), Arc::new(sample_bundle("SPY")));
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.insert(key("QQQ"), Arc::new(sample_bundle("QQQ")));
        assert_eq!(cache.entries().len(), 2);
        tokio::time::advance(Duration::from_secs(31)).await;
        cache.insert(key("IWM"), Arc::new(sample_bundle("IWM")));
        assert!(cache.get(&key("SPY")).is_none());
        assert!(cache.get(&key("QQQ")).is_some());
        assert_eq!(cache.entries().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_expired() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(key("SPY"), Arc::new(sample_bundle("SPY")));
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.purge_expired();
        assert!(cache.entries().is_empty());
    }
}
