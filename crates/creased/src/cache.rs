//! Response cache keyed by category, query and state fingerprint.
//!
//! Each entry carries its own TTL: augmented answers live longer than
//! deterministic fallbacks, which are cheap to rebuild.

use crease_common::StateFingerprint;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::dispatcher::AnswerSource;
use crate::router::Category;

#[derive(Debug, Clone)]
struct CacheEntry {
    text: String,
    source: AnswerSource,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// A cached answer and where it originally came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    pub text: String,
    pub source: AnswerSource,
}

/// LRU-bounded answer cache with per-entry TTL
#[derive(Clone)]
pub struct ResponseCache {
    cache: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

/// SHA-256 hex over category, normalised query and fingerprint.
pub fn cache_key(category: Category, query: &str, fingerprint: &StateFingerprint) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(query.trim().to_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(fingerprint.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` answers (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Live entry for `key`, if any. Expired entries are evicted here.
    pub async fn get(&self, key: &str) -> Option<CachedAnswer> {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        if let Some(entry) = cache.get(key) {
            if !entry.is_expired(now) {
                return Some(CachedAnswer {
                    text: entry.text.clone(),
                    source: entry.source,
                });
            }
            cache.pop(key);
        }
        None
    }

    pub async fn insert(&self, key: String, text: String, source: AnswerSource, ttl: Duration) {
        let mut cache = self.cache.lock().await;
        cache.put(
            key,
            CacheEntry {
                text,
                source,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop every expired entry.
    pub async fn prune_expired(&self) {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        let expired_keys: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired_keys {
            cache.pop(&key);
        }
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_common::Overs;

    fn fingerprint(runs: u32) -> StateFingerprint {
        StateFingerprint {
            total_runs: runs,
            wickets_lost: 2,
            overs_played: Overs::from_whole(6),
            p_draw_bp: 3500,
        }
    }

    #[test]
    fn test_key_normalises_query() {
        let fp = fingerprint(27);
        let a = cache_key(Category::Stats, "What's the score?", &fp);
        let b = cache_key(Category::Stats, "  what's the SCORE?  ", &fp);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_key_separates_inputs() {
        let fp = fingerprint(27);
        let base = cache_key(Category::Stats, "score", &fp);
        assert_ne!(base, cache_key(Category::Momentum, "score", &fp));
        assert_ne!(base, cache_key(Category::Stats, "score?", &fp));
        assert_ne!(base, cache_key(Category::Stats, "score", &fingerprint(31)));
    }

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = ResponseCache::new(10);
        assert!(cache.get("k").await.is_none());

        cache
            .insert(
                "k".to_string(),
                "India 27/2".to_string(),
                AnswerSource::Deterministic,
                Duration::from_secs(60),
            )
            .await;
        let hit = cache.get("k").await.unwrap();
        assert_eq!(hit.text, "India 27/2");
        assert_eq!(hit.source, AnswerSource::Deterministic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_entry_ttl() {
        let cache = ResponseCache::new(10);
        cache
            .insert(
                "short".to_string(),
                "a".to_string(),
                AnswerSource::Deterministic,
                Duration::from_secs(30),
            )
            .await;
        cache
            .insert(
                "long".to_string(),
                "b".to_string(),
                AnswerSource::Augmented,
                Duration::from_secs(600),
            )
            .await;

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_expired() {
        let cache = ResponseCache::new(10);
        for i in 0..3 {
            cache
                .insert(
                    format!("k{}", i),
                    "x".to_string(),
                    AnswerSource::Deterministic,
                    Duration::from_secs(10),
                )
                .await;
        }
        assert_eq!(cache.len().await, 3);

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.prune_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let cache = ResponseCache::new(2);
        for key in ["a", "b", "c"] {
            cache
                .insert(
                    key.to_string(),
                    key.to_string(),
                    AnswerSource::Deterministic,
                    Duration::from_secs(60),
                )
                .await;
        }
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("c").await.is_some());
    }
}
