//! Cached fetch layer.
//!
//! One [`CachedFetcher::fetch`] call performs a single logical request:
//!
//! 1. a fresh cache entry for the exact request descriptor short-circuits the network,
//! 2. otherwise the request is attempted under the [`RetryConfig`] policy,
//! 3. a success replaces the cache entry,
//! 4. exhausted retries fall back to an expired entry, flagged stale,
//! 5. with nothing cached the last failure is returned.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::http_client::{HttpClient, HttpRequest};
use crate::retry::{FailureClass, RetryConfig};

/// Payload returned by the fetch layer together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub data: Value,
    pub from_cache: bool,
    pub is_stale: bool,
}

impl Fetched {
    fn network(data: Value) -> Self {
        Self {
            data,
            from_cache: false,
            is_stale: false,
        }
    }

    fn cached(data: Value) -> Self {
        Self {
            data,
            from_cache: true,
            is_stale: false,
        }
    }

    fn stale(data: Value) -> Self {
        Self {
            data,
            from_cache: true,
            is_stale: true,
        }
    }
}

/// Failure of a whole fetch: retries exhausted and no cached payload to fall back on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class} failure for {url}: {message}")]
pub struct FetchError {
    pub class: FailureClass,
    pub url: String,
    pub message: String,
    pub status: Option<u16>,
}

impl FetchError {
    fn new(
        class: FailureClass,
        request: &HttpRequest,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self {
            class,
            url: request.redacted_url().into_owned(),
            message: message.into(),
            status,
        }
    }

    pub const fn is_rate_limited(&self) -> bool {
        matches!(self.class, FailureClass::RateLimited)
    }
}

/// Resilient request executor shared by every source adapter.
#[derive(Clone)]
pub struct CachedFetcher {
    http: Arc<dyn HttpClient>,
    cache: CacheStore,
    retry: RetryConfig,
}

impl CachedFetcher {
    pub fn new(http: Arc<dyn HttpClient>, cache: CacheStore, retry: RetryConfig) -> Self {
        Self { http, cache, retry }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetches `request`, caching a success for `ttl` (the store default when `None`).
    pub async fn fetch(
        &self,
        request: HttpRequest,
        ttl: Option<Duration>,
    ) -> Result<Fetched, FetchError> {
        let key = CacheKey::from_request(&request);

        if let Some(data) = self.cache.get_fresh(&key).await {
            debug!(url = %request.redacted_url(), "cache hit");
            return Ok(Fetched::cached(data));
        }

        let mut attempt = 0_u32;
        let failure = loop {
            match self.attempt(&request).await {
                Ok(data) => {
                    self.cache.put(key, data.clone(), ttl).await;
                    return Ok(Fetched::network(data));
                }
                Err(error) => match self.retry.next_delay(error.class, attempt) {
                    Some(delay) => {
                        warn!(
                            url = %error.url,
                            attempt,
                            class = %error.class,
                            delay_ms = delay.as_millis() as u64,
                            "upstream attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => break error,
                },
            }
        };

        if let Some(data) = self.cache.get_stale(&key).await {
            warn!(
                url = %failure.url,
                class = %failure.class,
                "serving stale cache entry after upstream failure"
            );
            return Ok(Fetched::stale(data));
        }

        warn!(
            url = %failure.url,
            class = %failure.class,
            attempts = attempt + 1,
            error = %failure.message,
            "upstream request failed with nothing cached"
        );
        Err(failure)
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Value, FetchError> {
        let response = self
            .http
            .execute(request.clone())
            .await
            .map_err(|error| {
                FetchError::new(FailureClass::Transport, request, error.message(), None)
            })?;

        if response.status == 429 {
            return Err(FetchError::new(
                FailureClass::RateLimited,
                request,
                "rate limit exceeded",
                Some(response.status),
            ));
        }

        if !response.is_success() {
            return Err(FetchError::new(
                FailureClass::Status,
                request,
                format!("upstream returned HTTP {}", response.status),
                Some(response.status),
            ));
        }

        let data = parse_body(response.body);
        if let Some(message) = application_error(&data) {
            return Err(FetchError::new(
                FailureClass::Application,
                request,
                message,
                Some(response.status),
            ));
        }

        Ok(data)
    }
}

impl std::fmt::Debug for CachedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFetcher")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Non-JSON bodies (the mining endpoint answers with a bare signature) become strings.
fn parse_body(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

/// Returns the message of a truthy top-level `error` field.
pub(crate) fn application_error(data: &Value) -> Option<String> {
    let error = data.as_object()?.get("error")?;
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => Some(
            fields
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_owned),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_error_fields_are_not_failures() {
        assert_eq!(application_error(&json!({"error": null})), None);
        assert_eq!(application_error(&json!({"error": false})), None);
        assert_eq!(application_error(&json!({"error": ""})), None);
        assert_eq!(application_error(&json!({"error": 0})), None);
        assert_eq!(application_error(&json!({"swaps": 3})), None);
        assert_eq!(application_error(&json!("error")), None);
    }

    #[test]
    fn truthy_error_fields_carry_a_message() {
        assert_eq!(
            application_error(&json!({"error": "wallet not found"})),
            Some("wallet not found".to_owned())
        );
        assert_eq!(
            application_error(&json!({"error": {"code": -32602, "message": "invalid params"}})),
            Some("invalid params".to_owned())
        );
        assert_eq!(application_error(&json!({"error": true})), Some("true".to_owned()));
    }

    #[test]
    fn bodies_fall_back_to_strings_when_not_json() {
        assert_eq!(parse_body("{\"a\":1}".to_owned()), json!({"a": 1}));
        assert_eq!(parse_body("5abcDEF".to_owned()), json!("5abcDEF"));
        assert_eq!(parse_body("\"quoted\"".to_owned()), json!("quoted"));
        assert_eq!(parse_body("  ".to_owned()), Value::Null);
    }
}
