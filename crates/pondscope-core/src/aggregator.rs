//! Fan-out aggregator.
//!
//! Queries every source for a wallet concurrently, waits for all of them to settle,
//! and merges the outcomes through the static resolution tables. Aggregation itself
//! never fails: a failed source only contributes nothing.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::{HealthSource, ManifestSource, MiningSource};
use crate::data_source::{ChainIndexer, Freshness, SourceError, SourceResult, SourceStatus};
use crate::resolution::{Provenance, SourceSet, WalletStats};
use crate::{
    CacheStore, Chain, ChainActivity, HealthReport, Manifest, MiningStatus, SourceId,
    UtcDateTime, ValidationError, WalletAddress, WalletEvent,
};

/// Body of a multi-chain wallet lookup.
///
/// `solAddress` falls back to `address`; so does `ethAddress` when
/// `includeEthereum` is on (the default).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub eth_address: Option<String>,
    #[serde(default)]
    pub sol_address: Option<String>,
    #[serde(default = "default_include_ethereum")]
    pub include_ethereum: bool,
}

fn default_include_ethereum() -> bool {
    true
}

impl AggregateRequest {
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            include_ethereum: true,
            ..Self::default()
        }
    }

    /// Picks the per-chain addresses to query.
    ///
    /// A candidate of the wrong format is dropped for that chain. The request is
    /// rejected only when no address was given or none of them is usable.
    pub fn targets(&self) -> Result<Targets, ValidationError> {
        let given = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        let address = given(&self.address);
        let sol_candidate = given(&self.sol_address).or_else(|| address.clone());
        let eth_candidate = if self.include_ethereum {
            given(&self.eth_address).or_else(|| address.clone())
        } else {
            None
        };

        if sol_candidate.is_none() && eth_candidate.is_none() {
            return Err(ValidationError::EmptyAddress);
        }

        let targets = Targets {
            solana: sol_candidate
                .as_deref()
                .and_then(|value| WalletAddress::solana(value).ok()),
            ethereum: eth_candidate
                .as_deref()
                .and_then(|value| WalletAddress::ethereum(value).ok()),
        };

        if targets.solana.is_none() && targets.ethereum.is_none() {
            let value = sol_candidate.or(eth_candidate).unwrap_or_default();
            return Err(ValidationError::UnrecognizedAddress { value });
        }

        Ok(targets)
    }
}

/// Validated per-chain addresses of one aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    pub solana: Option<WalletAddress>,
    pub ethereum: Option<WalletAddress>,
}

/// Raw Pond0x payloads, passed through for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pond0xData {
    pub manifest: Option<Manifest>,
    pub health: Option<HealthReport>,
    pub mining: Option<MiningStatus>,
}

/// Merged view of one wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Both chains' events, newest first.
    pub events: Vec<WalletEvent>,
    pub stats: WalletStats,
    pub eth_data: Option<ChainActivity>,
    pub sol_data: Option<ChainActivity>,
    pub pond0x_data: Pond0xData,
    pub sources: BTreeMap<SourceId, SourceStatus>,
    pub provenance: Provenance,
}

/// Manifest lookup outcome for the single-manifest endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestLookup {
    pub manifest: Manifest,
    pub freshness: Freshness,
    /// `true` when synthesized from on-chain activity.
    pub derived: bool,
}

/// Wallet aggregator over the five configured sources.
pub struct Aggregator {
    cache: CacheStore,
    manifest: ManifestSource,
    health: HealthSource,
    mining: MiningSource,
    solana: Arc<dyn ChainIndexer>,
    ethereum: Arc<dyn ChainIndexer>,
}

impl Aggregator {
    pub fn new(
        cache: CacheStore,
        manifest: ManifestSource,
        health: HealthSource,
        mining: MiningSource,
        solana: Arc<dyn ChainIndexer>,
        ethereum: Arc<dyn ChainIndexer>,
    ) -> Self {
        Self {
            cache,
            manifest,
            health,
            mining,
            solana,
            ethereum,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn indexer(&self, chain: Chain) -> &dyn ChainIndexer {
        match chain {
            Chain::Solana => self.solana.as_ref(),
            Chain::Ethereum => self.ethereum.as_ref(),
        }
    }

    /// Queries every source for `targets` concurrently and merges the outcomes.
    pub async fn aggregate(&self, targets: &Targets) -> AggregateResult {
        let sol = targets.solana.as_ref();
        let eth = targets.ethereum.as_ref();

        let (manifest, health, mining, solana, ethereum) = tokio::join!(
            settle(SourceId::Manifest, sol.map(|address| self.manifest.fetch(address))),
            settle(SourceId::Health, sol.map(|address| self.health.fetch(address))),
            settle(SourceId::Mining, sol.map(|address| self.mining.fetch(address))),
            settle(SourceId::Solana, sol.map(|address| self.solana.activity(address))),
            settle(SourceId::Ethereum, eth.map(|address| self.ethereum.activity(address))),
        );

        let set = SourceSet {
            manifest,
            health,
            mining,
            solana,
            ethereum,
            resolved_at: UtcDateTime::now(),
        };

        let result = assemble(set);
        info!(
            solana = ?sol.map(WalletAddress::as_str),
            ethereum = ?eth.map(WalletAddress::as_str),
            events = result.events.len(),
            total_swaps = result.stats.total_swaps,
            failed = result
                .sources
                .values()
                .filter(|status| **status == SourceStatus::Failed)
                .count(),
            "wallet aggregated"
        );
        result
    }

    /// Activity of one address on its own chain.
    pub async fn chain_activity(
        &self,
        address: &WalletAddress,
    ) -> Result<(ChainActivity, Freshness), SourceError> {
        self.indexer(address.chain()).activity(address).await
    }

    /// Manifest for a Solana address, derived from on-chain swaps when the manifest API fails.
    pub async fn manifest_or_derived(
        &self,
        address: &WalletAddress,
    ) -> Result<ManifestLookup, SourceError> {
        let manifest_error = match self.manifest.fetch(address).await {
            Ok((manifest, freshness)) => {
                return Ok(ManifestLookup {
                    manifest,
                    freshness,
                    derived: false,
                })
            }
            Err(error) => error,
        };

        warn!(
            %address,
            code = manifest_error.code(),
            error = %manifest_error,
            "manifest unavailable, deriving from chain activity"
        );
        let (activity, freshness) = self.solana.activity(address).await?;

        Ok(ManifestLookup {
            manifest: Manifest::from_chain_activity(address, activity.stats.total_swaps),
            freshness,
            derived: true,
        })
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("cache", &self.cache)
            .field("manifest", &self.manifest)
            .field("health", &self.health)
            .field("mining", &self.mining)
            .finish_non_exhaustive()
    }
}

/// Awaits one source call, if there is one, and logs its failure.
async fn settle<T, F>(source: SourceId, call: Option<F>) -> Option<SourceResult<T>>
where
    F: Future<Output = Result<(T, Freshness), SourceError>>,
{
    let outcome = call?.await;
    if let Err(error) = &outcome {
        warn!(%source, code = error.code(), error = %error, "source failed");
    }
    Some(SourceResult::from(outcome))
}

/// Builds the aggregate from settled sources.
pub fn assemble(set: SourceSet) -> AggregateResult {
    let (stats, provenance) = WalletStats::resolve(&set);
    let sources = set.statuses();

    let SourceSet {
        manifest,
        health,
        mining,
        solana,
        ethereum,
        ..
    } = set;

    let eth_data = ethereum.and_then(SourceResult::into_payload);
    let sol_data = solana.and_then(SourceResult::into_payload);
    let events = merge_events(
        [&eth_data, &sol_data]
            .into_iter()
            .flatten()
            .map(|activity| activity.events.clone()),
    );

    let pond0x_data = Pond0xData {
        manifest: manifest.and_then(SourceResult::into_payload),
        health: health.and_then(SourceResult::into_payload),
        // A queried but failed mining source reads as "no live session".
        mining: mining.map(|result| result.into_payload().unwrap_or_else(MiningStatus::inactive)),
    };

    AggregateResult {
        events,
        stats,
        eth_data,
        sol_data,
        pond0x_data,
        sources,
        provenance,
    }
}

/// Concatenates event lists and sorts them newest first. Ties keep input order.
pub fn merge_events<I>(lists: I) -> Vec<WalletEvent>
where
    I: IntoIterator<Item = Vec<WalletEvent>>,
{
    let mut events = lists.into_iter().flatten().collect::<Vec<_>>();
    events.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;

    const SOL: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const ETH: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    fn event(hash: &str, timestamp: i64) -> WalletEvent {
        WalletEvent::new(Chain::Solana, EventKind::Swap, hash, timestamp, "")
    }

    #[test]
    fn merged_events_are_newest_first() {
        let merged = merge_events([
            vec![event("a", 100), event("c", 300)],
            vec![event("b", 200)],
        ]);

        let timestamps = merged.iter().map(|e| e.timestamp).collect::<Vec<_>>();
        assert_eq!(timestamps, vec![300, 200, 100]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let merged = merge_events([vec![event("first", 5)], vec![event("second", 5)]]);
        assert_eq!(merged[0].hash, "first");
        assert_eq!(merged[1].hash, "second");
    }

    #[test]
    fn single_address_feeds_both_chains_when_it_fits() {
        let targets = AggregateRequest::for_address(SOL).targets().expect("usable");
        assert_eq!(targets.solana.as_ref().map(WalletAddress::as_str), Some(SOL));
        assert_eq!(targets.ethereum, None, "a Solana address is not an Ethereum one");
    }

    #[test]
    fn explicit_addresses_override_the_shared_one() {
        let request = AggregateRequest {
            address: Some("ignored".to_owned()),
            eth_address: Some(ETH.to_owned()),
            sol_address: Some(SOL.to_owned()),
            include_ethereum: true,
        };

        let targets = request.targets().expect("usable");

        assert!(targets.solana.is_some());
        assert_eq!(targets.ethereum.as_ref().map(WalletAddress::as_str), Some(ETH));
    }

    #[test]
    fn ethereum_can_be_excluded() {
        let request = AggregateRequest {
            address: Some(SOL.to_owned()),
            eth_address: Some(ETH.to_owned()),
            include_ethereum: false,
            ..AggregateRequest::default()
        };

        assert_eq!(request.targets().expect("usable").ethereum, None);
    }

    #[test]
    fn missing_or_unusable_addresses_are_rejected() {
        assert_eq!(
            AggregateRequest::default().targets(),
            Err(ValidationError::EmptyAddress)
        );
        assert_eq!(
            AggregateRequest::for_address("   ").targets(),
            Err(ValidationError::EmptyAddress)
        );
        assert!(matches!(
            AggregateRequest::for_address("not-a-wallet").targets(),
            Err(ValidationError::UnrecognizedAddress { .. })
        ));
    }

    #[test]
    fn include_ethereum_defaults_to_true_when_deserialized() {
        let request: AggregateRequest =
            serde_json::from_value(serde_json::json!({"address": SOL})).expect("valid body");
        assert!(request.include_ethereum);
    }

    #[test]
    fn failed_mining_reads_as_inactive_and_skipped_as_absent() {
        let mut set = SourceSet::empty(UtcDateTime::now());
        set.mining = Some(SourceResult::Failure(SourceError::unavailable("down")));

        let result = assemble(set);

        assert_eq!(result.pond0x_data.mining, Some(MiningStatus::inactive()));
        assert_eq!(result.pond0x_data.manifest, None);
        assert_eq!(result.sources[&SourceId::Mining], SourceStatus::Failed);
        assert_eq!(result.sources[&SourceId::Manifest], SourceStatus::Skipped);
    }
}
