//! In-memory TTL cache for upstream payloads.
//!
//! Entries are replaced wholesale and never evicted on read: an expired entry stays
//! around so the fetch layer can serve it when the upstream is down.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::http_client::HttpRequest;

/// Cache key derived from a full request descriptor (method, URL, headers, body).
///
/// Displays as a redacted label, so keys can be listed without leaking credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    identity: String,
    label: String,
}

impl CacheKey {
    pub fn from_request(request: &HttpRequest) -> Self {
        let headers = request
            .headers
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        let body = request.body.as_deref().unwrap_or_default();

        Self {
            identity: format!(
                "{} {} [{}] {}",
                request.method.as_str(),
                request.url,
                headers,
                body
            ),
            label: format!(
                "{} {} {}",
                request.method.as_str(),
                request.redacted_url(),
                body
            )
            .trim_end()
            .to_owned(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    captured_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Snapshot of one cache entry for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryStats {
    pub key: String,
    /// Seconds since the entry was captured.
    pub age_secs: u64,
    /// Seconds until expiry; negative once the entry is stale.
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<CacheEntryStats>,
}

/// Thread-safe in-memory cache for upstream payloads.
///
/// Cloning the store clones the handle, not the contents.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<HashMap<CacheKey, CacheEntry>>>,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Cache store with a default TTL of 5 minutes.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the payload only while the entry is within its TTL.
    pub async fn get_fresh(&self, key: &CacheKey) -> Option<Value> {
        let now = Instant::now();
        let store = self.inner.read().await;
        store
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.payload.clone())
    }

    /// Returns the payload regardless of expiry.
    pub async fn get_stale(&self, key: &CacheKey) -> Option<Value> {
        let store = self.inner.read().await;
        store.get(key).map(|entry| entry.payload.clone())
    }

    /// Replaces the entry for `key`.
    ///
    /// A zero TTL is a no-op: an entry must expire strictly after it was captured.
    pub async fn put(&self, key: CacheKey, payload: Value, ttl_override: Option<Duration>) {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return;
        }

        let captured_at = Instant::now();
        let entry = CacheEntry {
            payload,
            captured_at,
            expires_at: captured_at + ttl,
        };
        self.inner.write().await.insert(key, entry);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Number of entries, including expired ones.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let store = self.inner.read().await;
        let mut entries = store
            .iter()
            .map(|(key, entry)| {
                let age = now.saturating_duration_since(entry.captured_at);
                let ttl_secs = if entry.is_fresh(now) {
                    signed_secs(entry.expires_at.saturating_duration_since(now))
                } else {
                    -signed_secs(now.saturating_duration_since(entry.expires_at))
                };
                CacheEntryStats {
                    key: key.to_string(),
                    age_secs: age.as_secs(),
                    ttl_secs,
                }
            })
            .collect::<Vec<_>>();
        entries.sort_by(|left, right| left.key.cmp(&right.key));

        CacheStats {
            size: store.len(),
            entries,
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

fn signed_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(url: &str) -> CacheKey {
        CacheKey::from_request(&HttpRequest::get(url))
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_are_served_until_expiry() {
        let cache = CacheStore::new(Duration::from_secs(1));
        let key = key("https://a.test/manifest/x");

        assert!(cache.get_fresh(&key).await.is_none());

        cache.put(key.clone(), json!({"swaps": 1}), None).await;
        assert_eq!(cache.get_fresh(&key).await, Some(json!({"swaps": 1})));

        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(cache.get_fresh(&key).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_remain_readable_as_stale() {
        let cache = CacheStore::new(Duration::from_millis(100));
        let key = key("https://a.test/health/x");

        cache.put(key.clone(), json!({"stats": {}}), None).await;
        tokio::time::advance(Duration::from_millis(150)).await;

        assert!(cache.get_fresh(&key).await.is_none());
        assert_eq!(cache.get_stale(&key).await, Some(json!({"stats": {}})));
        assert_eq!(cache.len().await, 1, "probing must not evict");
    }

    #[tokio::test(start_paused = true)]
    async fn put_replaces_whole_entry_and_restarts_ttl() {
        let cache = CacheStore::new(Duration::from_secs(10));
        let key = key("https://a.test/x");

        cache.put(key.clone(), json!(1), None).await;
        tokio::time::advance(Duration::from_secs(9)).await;
        cache.put(key.clone(), json!(2), None).await;
        tokio::time::advance(Duration::from_secs(9)).await;

        assert_eq!(cache.get_fresh(&key).await, Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_override_wins_over_default() {
        let cache = CacheStore::new(Duration::from_secs(60));
        let key = key("https://a.test/x");

        cache
            .put(key.clone(), json!(true), Some(Duration::from_millis(100)))
            .await;
        tokio::time::advance(Duration::from_millis(150)).await;

        assert!(cache.get_fresh(&key).await.is_none());
    }

    #[tokio::test]
    async fn zero_ttl_never_writes() {
        let cache = CacheStore::new(Duration::ZERO);
        cache.put(key("https://a.test/x"), json!(1), None).await;
        assert!(cache.is_empty().await);
    }

    #[test]
    fn descriptor_differences_produce_distinct_keys() {
        let plain = HttpRequest::get("https://a.test/x");
        let with_header = plain.clone().with_header("Origin", "https://pond0x.com");
        let post = HttpRequest::post_json("https://a.test/x", &json!({"id": 1}));

        assert_ne!(CacheKey::from_request(&plain), CacheKey::from_request(&with_header));
        assert_ne!(CacheKey::from_request(&plain), CacheKey::from_request(&post));
        assert_eq!(
            CacheKey::from_request(&plain),
            CacheKey::from_request(&plain.clone())
        );
    }

    #[test]
    fn labels_hide_credentials() {
        let request = HttpRequest::post_json("https://rpc.a.test/?api-key=k3y", &json!({"id": 1}));
        let key = CacheKey::from_request(&request);

        assert_eq!(key.label(), r#"POST https://rpc.a.test/ {"id":1}"#);
        assert!(!key.to_string().contains("k3y"));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_report_age_and_negative_ttl_for_stale_entries() {
        let cache = CacheStore::new(Duration::from_secs(5));
        cache.put(key("https://a.test/x"), json!(1), None).await;
        tokio::time::advance(Duration::from_secs(8)).await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.entries[0].age_secs, 8);
        assert_eq!(stats.entries[0].ttl_secs, -3);

        cache.clear().await;
        assert_eq!(cache.stats().await.size, 0);
    }
}
