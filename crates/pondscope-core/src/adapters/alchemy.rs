use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Value};
use tracing::debug;

use crate::data_source::{ChainIndexer, Freshness, SourceError};
use crate::domain::lenient;
use crate::fetch::CachedFetcher;
use crate::http_client::HttpRequest;
use crate::{
    Chain, ChainActivity, ChainStats, EventKind, SourceId, UtcDateTime, WalletAddress,
    WalletEvent,
};

const TRANSFER_CATEGORIES: [&str; 5] = ["external", "internal", "erc20", "erc721", "erc1155"];

/// Ethereum activity from Alchemy `alchemy_getAssetTransfers`.
///
/// ERC-20 movements are counted as swaps; everything else is a plain transfer.
#[derive(Debug, Clone)]
pub struct AlchemyIndexer {
    fetcher: CachedFetcher,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl AlchemyIndexer {
    /// Most recent transfers requested per call (`0x64`).
    pub const MAX_TRANSFERS: u32 = 100;

    pub fn new(
        fetcher: CachedFetcher,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout_ms,
        }
    }

    fn request(&self, api_key: &str, address: &WalletAddress) -> HttpRequest {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "alchemy_getAssetTransfers",
            "params": [{
                "fromBlock": "0x0",
                "toBlock": "latest",
                "fromAddress": address.as_str(),
                "category": TRANSFER_CATEGORIES,
                "withMetadata": true,
                "excludeZeroValue": true,
                "maxCount": format!("{:#x}", Self::MAX_TRANSFERS),
            }],
        });
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(api_key)
        );
        HttpRequest::post_json(url, &body)
            .with_secret(api_key)
            .with_timeout_ms(self.timeout_ms)
    }

    async fn fetch_activity(
        &self,
        address: &WalletAddress,
    ) -> Result<(ChainActivity, Freshness), SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SourceError::not_configured(SourceId::Ethereum, "ALCHEMY_API_KEY"));
        };

        let fetched = self.fetcher.fetch(self.request(api_key, address), None).await?;
        let freshness = Freshness::of(&fetched);

        let transfers: &[Value] = match lenient::path(&fetched.data, &["result", "transfers"]) {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(SourceError::decode(
                    "alchemy transfers field is not an array",
                ))
            }
        };

        Ok((activity_from_transfers(transfers), freshness))
    }
}

fn activity_from_transfers(transfers: &[Value]) -> ChainActivity {
    let events = transfers
        .iter()
        .enumerate()
        .filter_map(|(index, transfer)| transfer_event(index, transfer))
        .collect::<Vec<_>>();

    let total_swaps = events
        .iter()
        .filter(|event| event.kind == EventKind::Swap)
        .count() as u64;
    let total_value = events.iter().filter_map(|event| event.amount).sum::<f64>();

    ChainActivity {
        chain: Chain::Ethereum,
        events,
        stats: ChainStats {
            total_swaps,
            total_value: total_value.round(),
            mining_rewards: 0.0,
        },
    }
}

fn transfer_event(index: usize, transfer: &Value) -> Option<WalletEvent> {
    let field = |key: &str| transfer.get(key).and_then(Value::as_str);

    let hash = field("hash")?;
    let timestamp = match lenient::path(transfer, &["metadata", "blockTimestamp"])
        .and_then(Value::as_str)
        .map(UtcDateTime::parse)
    {
        Some(Ok(timestamp)) => timestamp.unix_millis(),
        _ => {
            debug!(hash, "skipping transfer without a block timestamp");
            return None;
        }
    };

    let category = field("category").unwrap_or("external");
    let kind = if category == "erc20" {
        EventKind::Swap
    } else {
        EventKind::Transfer
    };
    let amount = transfer.get("value").and_then(lenient::number).unwrap_or(0.0);
    let asset = field("asset");

    let mut event = WalletEvent::new(
        Chain::Ethereum,
        kind,
        hash,
        timestamp,
        format!(
            "{}: {} {}",
            category.to_ascii_uppercase(),
            amount,
            asset.unwrap_or("ETH")
        ),
    );
    event.id = format!("eth_{hash}_{index}");
    event.amount = Some(amount);
    event.token = Some(asset.unwrap_or("ETH").to_owned());
    event.token_symbol = Some(asset.unwrap_or("ETH").to_owned());
    event.token_name = Some(asset.unwrap_or("Ethereum").to_owned());
    event.contract_address = lenient::path(transfer, &["rawContract", "address"])
        .and_then(Value::as_str)
        .map(str::to_owned);
    event.from_address = field("from").map(str::to_owned);
    event.to_address = field("to").map(str::to_owned);
    Some(event)
}

impl ChainIndexer for AlchemyIndexer {
    fn activity<'a>(
        &'a self,
        address: &'a WalletAddress,
    ) -> Pin<Box<dyn Future<Output = Result<(ChainActivity, Freshness), SourceError>> + Send + 'a>>
    {
        Box::pin(self.fetch_activity(address))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::{CacheStore, RetryConfig, ScriptedHttpClient};

    const ADDR: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    fn indexer(http: &ScriptedHttpClient) -> AlchemyIndexer {
        let fetcher = CachedFetcher::new(
            Arc::new(http.clone()),
            CacheStore::with_default_ttl(),
            RetryConfig::no_retry(),
        );
        AlchemyIndexer::new(fetcher, "https://eth.test/v2", Some("k3y".to_owned()), 10_000)
    }

    #[tokio::test]
    async fn transfers_are_categorized_and_summed() {
        let http = ScriptedHttpClient::new();
        http.respond(
            "https://eth.test/v2/",
            200,
            r#"{"jsonrpc":"2.0","id":1,"result":{"transfers":[
                {"hash":"0xa","category":"erc20","value":10.4,"asset":"USDC","from":"0x1","to":"0x2",
                 "rawContract":{"address":"0xusdc"},"metadata":{"blockTimestamp":"2024-01-02T00:00:00.000Z"}},
                {"hash":"0xb","category":"external","value":0.3,"asset":"ETH",
                 "metadata":{"blockTimestamp":"2024-01-01T00:00:00.000Z"}},
                {"hash":"0xc","category":"external","value":1,"asset":"ETH","metadata":{}}
            ]}}"#,
        );
        let address = WalletAddress::ethereum(ADDR).expect("valid");

        let (activity, _) = indexer(&http).activity(&address).await.expect("activity");

        assert_eq!(activity.events.len(), 2, "transfer without timestamp is skipped");
        assert_eq!(activity.events[0].id, "eth_0xa_0");
        assert_eq!(activity.events[0].kind, EventKind::Swap);
        assert_eq!(activity.events[0].description, "ERC20: 10.4 USDC");
        assert_eq!(activity.events[0].contract_address.as_deref(), Some("0xusdc"));
        assert_eq!(activity.events[1].kind, EventKind::Transfer);
        assert_eq!(activity.events[1].timestamp, 1_704_067_200_000);
        assert_eq!(activity.stats.total_swaps, 1);
        assert_eq!(activity.stats.total_value, 11.0);
    }

    #[tokio::test]
    async fn api_key_travels_in_the_path_but_never_in_errors() {
        let http = ScriptedHttpClient::new();
        http.respond("https://eth.test/v2/", 500, "");
        let address = WalletAddress::ethereum(ADDR).expect("valid");

        let error = indexer(&http).activity(&address).await.expect_err("status");

        assert_eq!(error.kind(), SourceErrorKind::Fetch);
        assert!(!error.message().contains("k3y"));
        assert_eq!(http.requests()[0].url, "https://eth.test/v2/k3y");
    }

    #[tokio::test]
    async fn missing_result_yields_empty_activity() {
        let http = ScriptedHttpClient::new();
        http.respond("https://eth.test/v2/", 200, r#"{"jsonrpc":"2.0","id":1}"#);
        let address = WalletAddress::ethereum(ADDR).expect("valid");

        let (activity, _) = indexer(&http).activity(&address).await.expect("activity");

        assert!(activity.events.is_empty());
        assert_eq!(activity.stats, ChainStats::default());
    }
}
