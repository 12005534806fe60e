//! # Pondscope Core
//!
//! Cached multi-source wallet aggregation for Pond0x analytics.
//!
//! ## Overview
//!
//! - **Cached fetch layer** with retry classification and stale fallback
//! - **Source adapters** for the Pond0x manifest, health and mining APIs and the
//!   Helius/Alchemy chain indexers
//! - **Fan-out aggregator** that settles every source and merges them through
//!   static field-resolution tables
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream source adapters |
//! | [`aggregator`] | Concurrent fan-out and result assembly |
//! | [`boost`] | Mining rig boost arithmetic |
//! | [`cache`] | In-memory TTL cache |
//! | [`config`] | Aggregator configuration and builder |
//! | [`data_source`] | Source outcomes, errors and the chain indexer trait |
//! | [`domain`] | Addresses, events and Pond0x payload models |
//! | [`error`] | Validation errors |
//! | [`fetch`] | Cached, retrying request executor |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`resolution`] | Field resolution across sources |
//! | [`retry`] | Failure classes and backoff |
//! | [`source`] | Source identifiers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pondscope_core::{AggregateRequest, AggregatorBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = AggregatorBuilder::from_env()?.build();
//!     let targets = AggregateRequest::for_address("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")
//!         .targets()?;
//!
//!     let result = aggregator.aggregate(&targets).await;
//!     println!("total swaps: {}", result.stats.total_swaps);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod aggregator;
pub mod boost;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod resolution;
pub mod retry;
pub mod source;

pub use adapters::{AlchemyIndexer, HealthSource, HeliusIndexer, ManifestSource, MiningSource};
pub use aggregator::{
    assemble, merge_events, AggregateRequest, AggregateResult, Aggregator, ManifestLookup,
    Pond0xData, Targets,
};
pub use boost::MiningBoost;
pub use cache::{CacheKey, CacheStats, CacheStore};
pub use config::{AggregatorBuilder, AggregatorConfig};
pub use data_source::{
    ChainIndexer, Freshness, SourceError, SourceErrorKind, SourceResult, SourceStatus,
};
pub use domain::{
    Chain, ChainActivity, ChainStats, EventKind, HealthReport, HealthStats, Manifest,
    MiningStatus, UtcDateTime, WalletAddress, WalletEvent,
};
pub use error::ValidationError;
pub use fetch::{CachedFetcher, FetchError, Fetched};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use resolution::{Provenance, SourceSet, WalletStats};
pub use retry::{Backoff, FailureClass, RetryConfig};
pub use source::SourceId;
