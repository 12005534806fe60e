//! Aggregator configuration and builder.
//!
//! Defaults point at the public Pond0x community and official APIs. Indexer API keys
//! have no default: without them the chain sources report `source.not_configured`.
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `POND0X_MANIFEST_BASE_URL` | manifest/health API base |
//! | `POND0X_API_BASE_URL` | official mining API base |
//! | `HELIUS_API_KEY` | Solana indexer key (RPC and enhanced transactions API) |
//! | `HELIUS_API_BASE_URL` | Helius enhanced transactions API base |
//! | `ALCHEMY_API_KEY` | Ethereum indexer key |
//! | `POND0X_CACHE_TTL_SECS` | cache TTL in seconds |
//! | `POND0X_TIMEOUT_MS` | per-request timeout |

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{AlchemyIndexer, HealthSource, HeliusIndexer, ManifestSource, MiningSource};
use crate::aggregator::Aggregator;
use crate::cache::CacheStore;
use crate::fetch::CachedFetcher;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::ValidationError;

pub const DEFAULT_MANIFEST_BASE_URL: &str = "https://www.cary0x.com/api";
pub const DEFAULT_POND0X_BASE_URL: &str = "https://www.pond0x.com/api";
pub const DEFAULT_HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com";
pub const DEFAULT_HELIUS_API_URL: &str = "https://api.helius.xyz/v0";
pub const DEFAULT_ALCHEMY_BASE_URL: &str = "https://eth-mainnet.g.alchemy.com/v2";

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    pub manifest_base_url: String,
    pub pond0x_base_url: String,
    pub helius_rpc_url: String,
    pub helius_api_url: String,
    pub helius_api_key: Option<String>,
    pub alchemy_base_url: String,
    pub alchemy_api_key: Option<String>,
    pub cache_ttl: Duration,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            manifest_base_url: DEFAULT_MANIFEST_BASE_URL.to_owned(),
            pond0x_base_url: DEFAULT_POND0X_BASE_URL.to_owned(),
            helius_rpc_url: DEFAULT_HELIUS_RPC_URL.to_owned(),
            helius_api_url: DEFAULT_HELIUS_API_URL.to_owned(),
            helius_api_key: None,
            alchemy_base_url: DEFAULT_ALCHEMY_BASE_URL.to_owned(),
            alchemy_api_key: None,
            cache_ttl: Duration::from_secs(300),
            timeout_ms: 10_000,
            retry: RetryConfig::default(),
        }
    }
}

/// Builder for [`Aggregator`].
///
/// # Example
///
/// ```rust,ignore
/// use pondscope_core::{AggregatorBuilder, AggregateRequest};
///
/// let aggregator = AggregatorBuilder::from_env()?.build();
/// let targets = AggregateRequest::for_address("7xKX...").targets()?;
/// let result = aggregator.aggregate(&targets).await;
/// ```
#[derive(Default)]
pub struct AggregatorBuilder {
    config: AggregatorConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    cache: Option<CacheStore>,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builder with defaults overridden by `lookup` (an environment stand-in).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = AggregatorConfig::default();

        if let Some(url) = value("POND0X_MANIFEST_BASE_URL") {
            config.manifest_base_url = url;
        }
        if let Some(url) = value("POND0X_API_BASE_URL") {
            config.pond0x_base_url = url;
        }
        if let Some(url) = value("HELIUS_API_BASE_URL") {
            config.helius_api_url = url;
        }
        config.helius_api_key = value("HELIUS_API_KEY");
        config.alchemy_api_key = value("ALCHEMY_API_KEY");
        if let Some(raw) = value("POND0X_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(parse_setting("POND0X_CACHE_TTL_SECS", &raw)?);
        }
        if let Some(raw) = value("POND0X_TIMEOUT_MS") {
            config.timeout_ms = parse_setting("POND0X_TIMEOUT_MS", &raw)?;
        }

        Ok(Self::new().with_config(config))
    }

    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Shares an existing cache instead of creating one with the configured TTL.
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn with_manifest_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.manifest_base_url = url.into();
        self
    }

    pub fn with_pond0x_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.pond0x_base_url = url.into();
        self
    }

    pub fn with_helius(mut self, rpc_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.config.helius_rpc_url = rpc_url.into();
        self.config.helius_api_key = Some(api_key.into());
        self
    }

    pub fn with_helius_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.helius_api_url = url.into();
        self
    }

    pub fn with_alchemy(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.config.alchemy_base_url = base_url.into();
        self.config.alchemy_api_key = Some(api_key.into());
        self
    }

    pub fn build(self) -> Aggregator {
        let config = self.config;
        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(http_client) => http_client,
            None => Arc::new(ReqwestHttpClient::new()),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| CacheStore::new(config.cache_ttl));
        let fetcher = CachedFetcher::new(http_client, cache.clone(), config.retry.clone());
        let timeout_ms = config.timeout_ms;

        Aggregator::new(
            cache,
            ManifestSource::new(fetcher.clone(), &config.manifest_base_url, timeout_ms),
            HealthSource::new(fetcher.clone(), &config.manifest_base_url, timeout_ms),
            MiningSource::new(fetcher.clone(), &config.pond0x_base_url, timeout_ms),
            Arc::new(HeliusIndexer::new(
                fetcher.clone(),
                &config.helius_rpc_url,
                &config.helius_api_url,
                config.helius_api_key.clone(),
                timeout_ms,
            )),
            Arc::new(AlchemyIndexer::new(
                fetcher,
                &config.alchemy_base_url,
                config.alchemy_api_key.clone(),
                timeout_ms,
            )),
        )
    }
}

fn parse_setting(key: &'static str, raw: &str) -> Result<u64, ValidationError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidSetting {
            key,
            value: raw.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_public_endpoints() {
        let config = AggregatorConfig::default();
        assert_eq!(config.manifest_base_url, "https://www.cary0x.com/api");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.helius_api_key.is_none());
        assert_eq!(config.helius_api_url, "https://api.helius.xyz/v0");
    }

    #[test]
    fn environment_overrides_defaults() {
        let builder = AggregatorBuilder::from_lookup(lookup(&[
            ("POND0X_MANIFEST_BASE_URL", "http://localhost:9000/api"),
            ("HELIUS_API_KEY", "helius"),
            ("HELIUS_API_BASE_URL", "http://localhost:9001/v0"),
            ("ALCHEMY_API_KEY", ""),
            ("POND0X_CACHE_TTL_SECS", "60"),
            ("POND0X_TIMEOUT_MS", " 2500 "),
        ]))
        .expect("valid settings");

        let config = builder.config();
        assert_eq!(config.manifest_base_url, "http://localhost:9000/api");
        assert_eq!(config.pond0x_base_url, DEFAULT_POND0X_BASE_URL);
        assert_eq!(config.helius_api_key.as_deref(), Some("helius"));
        assert_eq!(config.helius_api_url, "http://localhost:9001/v0");
        assert_eq!(config.alchemy_api_key, None, "blank keys count as unset");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.timeout_ms, 2_500);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let error = AggregatorBuilder::from_lookup(lookup(&[("POND0X_TIMEOUT_MS", "soon")]))
            .err()
            .expect("invalid timeout");

        assert_eq!(
            error,
            ValidationError::InvalidSetting {
                key: "POND0X_TIMEOUT_MS",
                value: "soon".to_owned(),
            }
        );
    }
}
