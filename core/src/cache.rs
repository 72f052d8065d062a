//! Response cache keyed by `"<VERB>_<url>"`.
//!
//! # Design
//! A bounded LRU behind a `Mutex`. An LRU read reorders entries, so every
//! access takes the lock; readers never see a half-written entry. Entries
//! expire after the configured TTL and are dropped lazily on lookup. One
//! process-wide instance is available through `ResponseCache::shared`;
//! dispatchers may also own a private cache.

use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::http::{ApiResponse, HttpMethod};

pub const DEFAULT_CAPACITY: usize = 512;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

static SHARED: LazyLock<Arc<ResponseCache>> =
    LazyLock::new(|| Arc::new(ResponseCache::new(CacheConfig::default())));

/// Size and lifetime limits of a `ResponseCache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    /// `None` keeps entries until evicted or invalidated.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: Some(DEFAULT_TTL),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: ApiResponse,
    expiry: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// The process-wide cache.
    pub fn shared() -> Arc<ResponseCache> {
        Arc::clone(&SHARED)
    }

    pub fn key(verb: HttpMethod, url: &str) -> String {
        format!("{verb}_{url}")
    }

    /// Cached copy of the response under `key`, marked `from_cache`.
    pub fn get(&self, key: &str) -> Option<ApiResponse> {
        let mut entries = self.lock();
        let expired = entries.peek(key)?.is_expired(Instant::now());
        if expired {
            entries.pop(key);
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        entries.get(key).map(|entry| ApiResponse {
            from_cache: true,
            ..entry.response.clone()
        })
    }

    /// Store a copy of `response` under `key`, replacing any previous entry.
    pub fn put(&self, key: &str, response: &ApiResponse) {
        let entry = CacheEntry {
            response: ApiResponse {
                from_cache: false,
                ..response.clone()
            },
            expiry: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        self.lock().put(key.to_string(), entry);
    }

    /// Drop the entry under `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;

    fn response(body: &str) -> ApiResponse {
        ApiResponse {
            status_code: 200,
            raw_body: body.to_string(),
            json_body: serde_json::from_str(body).ok(),
            from_cache: false,
        }
    }

    #[test]
    fn key_combines_verb_and_url() {
        assert_eq!(
            ResponseCache::key(HttpMethod::Get, "https://x/v1/payments/1"),
            "GET_https://x/v1/payments/1"
        );
    }

    #[test]
    fn put_then_get_marks_from_cache() {
        let cache = ResponseCache::default();
        let resp = response(r#"{"id":"1"}"#);
        cache.put("GET_/a", &resp);

        let hit = cache.get("GET_/a").unwrap();
        assert!(hit.from_cache);
        assert_eq!(ApiResponse { from_cache: false, ..hit }, resp);
    }

    #[test]
    fn miss_on_unknown_key() {
        let cache = ResponseCache::default();
        assert!(cache.get("GET_/nothing").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ResponseCache::default();
        cache.put("GET_/a", &response("{}"));
        assert!(cache.invalidate("GET_/a"));
        assert!(!cache.invalidate("GET_/a"));
        assert!(cache.get("GET_/a").is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(CacheConfig {
            capacity: 4,
            ttl: Some(Duration::ZERO),
        });
        cache.put("GET_/a", &response("{}"));
        assert!(cache.get("GET_/a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = ResponseCache::new(CacheConfig {
            capacity: 2,
            ttl: None,
        });
        cache.put("a", &response("1"));
        cache.put("b", &response("2"));
        assert!(cache.get("a").is_some());
        cache.put("c", &response("3"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = ResponseCache::new(CacheConfig { capacity: 0, ttl: None });
        cache.put("a", &response("1"));
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn concurrent_writers_and_readers_see_whole_entries() {
        let cache = Arc::new(ResponseCache::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for n in 0..200 {
                        let body = json!({"writer": i, "n": n}).to_string();
                        cache.put("GET_/shared", &response(&body));
                        if let Some(hit) = cache.get("GET_/shared") {
                            let parsed: serde_json::Value =
                                serde_json::from_str(&hit.raw_body).unwrap();
                            assert_eq!(hit.json_body.unwrap(), parsed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
