use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adapters::round_cents;
use crate::data_source::{ChainIndexer, Freshness, SourceError};
use crate::domain::lenient;
use crate::fetch::CachedFetcher;
use crate::http_client::HttpRequest;
use crate::{
    Chain, ChainActivity, ChainStats, EventKind, SourceId, UtcDateTime, WalletAddress,
    WalletEvent,
};

/// Signatures requested per call; the RPC maximum.
const SIGNATURE_LIMIT: u32 = 1_000;
/// Parsed transactions requested from the enhanced API.
const ENHANCED_LIMIT: u32 = 500;
/// Timeline length cap.
const MAX_EVENTS: usize = 500;
/// Fixed SOL/USD rate used to express value in dollars.
const SOL_TO_USD: f64 = 200.0;
const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Solana activity from Helius.
///
/// `getSignaturesForAddress` is authoritative for which transactions exist. The
/// enhanced transactions API adds descriptions and amounts where it has them; when
/// it is down, every successful signature counts as a swap and every errored one
/// as failed.
#[derive(Debug, Clone)]
pub struct HeliusIndexer {
    fetcher: CachedFetcher,
    rpc_url: String,
    api_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct SignatureInfo {
    signature: String,
    #[serde(default)]
    slot: Option<u64>,
    #[serde(default, rename = "blockTime")]
    block_time: Option<i64>,
    #[serde(default)]
    err: Option<Value>,
}

impl HeliusIndexer {
    pub fn new(
        fetcher: CachedFetcher,
        rpc_url: impl Into<String>,
        api_url: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            fetcher,
            rpc_url: rpc_url.into(),
            api_url: api_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout_ms,
        }
    }

    fn signatures_request(&self, api_key: &str, address: &WalletAddress) -> HttpRequest {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getSignaturesForAddress",
            "params": [address.as_str(), {"limit": SIGNATURE_LIMIT}],
        });
        let url = format!(
            "{}/?api-key={}",
            self.rpc_url.trim_end_matches('/'),
            urlencoding::encode(api_key)
        );
        HttpRequest::post_json(url, &body)
            .with_secret(api_key)
            .with_timeout_ms(self.timeout_ms)
    }

    fn enhanced_request(&self, api_key: &str, address: &WalletAddress) -> HttpRequest {
        let url = format!(
            "{}/addresses/{}/transactions?api-key={}&limit={ENHANCED_LIMIT}",
            self.api_url.trim_end_matches('/'),
            urlencoding::encode(address.as_str()),
            urlencoding::encode(api_key)
        );
        HttpRequest::get(url)
            .with_secret(api_key)
            .with_timeout_ms(self.timeout_ms)
    }

    async fn fetch_activity(
        &self,
        address: &WalletAddress,
    ) -> Result<(ChainActivity, Freshness), SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SourceError::not_configured(SourceId::Solana, "HELIUS_API_KEY"));
        };

        let fetched = self
            .fetcher
            .fetch(self.signatures_request(api_key, address), None)
            .await?;
        let freshness = Freshness::of(&fetched);

        let signatures = match fetched.data.get("result") {
            Some(Value::Null) | None => Vec::new(),
            Some(result) => Vec::<SignatureInfo>::deserialize(result).map_err(|error| {
                SourceError::decode(format!("helius signatures malformed: {error}"))
            })?,
        };
        let enhanced = self.enhanced_transactions(api_key, address).await;

        let now = UtcDateTime::now().unix_millis();
        Ok((
            build_activity(&signatures, &enhanced, address.as_str(), now),
            freshness,
        ))
    }

    /// Parsed transactions, or nothing when the enhanced API is unavailable.
    async fn enhanced_transactions(&self, api_key: &str, address: &WalletAddress) -> Vec<Value> {
        match self
            .fetcher
            .fetch(self.enhanced_request(api_key, address), None)
            .await
        {
            Ok(fetched) => match fetched.data {
                Value::Array(records) => records,
                _ => {
                    debug!("enhanced transactions payload is not a list");
                    Vec::new()
                }
            },
            Err(error) => {
                warn!(
                    url = %error.url,
                    class = %error.class,
                    error = %error.message,
                    "enhanced transactions unavailable, using signatures only"
                );
                Vec::new()
            }
        }
    }
}

fn build_activity(
    signatures: &[SignatureInfo],
    enhanced: &[Value],
    owner: &str,
    now_millis: i64,
) -> ChainActivity {
    let mut detailed = enhanced
        .iter()
        .filter_map(|record| enhanced_event(record, owner, now_millis))
        .map(|event| (event.hash.clone(), event))
        .collect::<HashMap<_, _>>();

    let mut events = signatures
        .iter()
        .take(MAX_EVENTS)
        .map(|info| {
            detailed
                .remove(&info.signature)
                .unwrap_or_else(|| signature_event(info, now_millis))
        })
        .collect::<Vec<_>>();

    // Parsed transactions the signature page did not list.
    let mut unlisted = detailed.into_values().collect::<Vec<_>>();
    unlisted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
    events.extend(unlisted);
    events.truncate(MAX_EVENTS);

    let swaps = events.iter().filter(|event| event.kind == EventKind::Swap);
    let total_swaps = swaps.clone().count() as u64;
    let mining_rewards = swaps.filter_map(|event| event.amount).sum::<f64>();
    let total_value = events
        .iter()
        .filter_map(|event| event.amount)
        .map(f64::abs)
        .sum::<f64>();

    ChainActivity {
        chain: Chain::Solana,
        events,
        stats: ChainStats {
            total_swaps,
            total_value: round_cents(total_value * SOL_TO_USD),
            mining_rewards: round_cents(mining_rewards),
        },
    }
}

fn signature_event(info: &SignatureInfo, now_millis: i64) -> WalletEvent {
    let block = info
        .slot
        .map_or_else(|| "unknown".to_owned(), |slot| slot.to_string());

    let (kind, description) = match info.err.as_ref().filter(|err| !err.is_null()) {
        Some(err) => (
            EventKind::Failed,
            format!("Failed program interaction: {} (block {block})", error_label(err)),
        ),
        None => (
            EventKind::Swap,
            format!("Solana program interaction (block {block})"),
        ),
    };

    let timestamp = info
        .block_time
        .map_or(now_millis, |seconds| seconds.saturating_mul(1_000));

    let mut event = WalletEvent::new(Chain::Solana, kind, &info.signature, timestamp, description);
    sol_token(&mut event);
    event
}

/// One enhanced-API record; `None` when it carries no signature.
fn enhanced_event(record: &Value, owner: &str, now_millis: i64) -> Option<WalletEvent> {
    let signature = record.get("signature").and_then(lenient::string)?;
    let description = record.get("description").and_then(lenient::string);
    let failed = record.get("transactionError").is_some_and(lenient::truthy);

    let kind = if failed {
        EventKind::Failed
    } else if is_swap(record, description.as_deref()) {
        EventKind::Swap
    } else {
        EventKind::Transfer
    };
    let mut description = description.unwrap_or_else(|| "Solana transaction".to_owned());
    if failed {
        description.push_str(" (failed)");
    }
    let timestamp = record
        .get("timestamp")
        .and_then(lenient::integer)
        .map_or(now_millis, |seconds| seconds.saturating_mul(1_000));

    let mut event = WalletEvent::new(Chain::Solana, kind, signature, timestamp, description);
    sol_token(&mut event);

    if let Some(transfer) = owned_transfer(record, "tokenTransfers", owner) {
        let field = |key: &str| transfer.get(key).and_then(lenient::string);
        let symbol = field("symbol");
        let mint = field("mint");
        event.amount = transfer.get("tokenAmount").and_then(lenient::number).map(f64::abs);
        event.token = symbol.clone().or_else(|| mint.clone());
        event.token_name = field("name").or_else(|| symbol.clone());
        event.token_symbol = symbol;
        event.contract_address = mint;
    } else if let Some(transfer) = owned_transfer(record, "nativeTransfers", owner) {
        event.amount = transfer
            .get("amount")
            .and_then(lenient::number)
            .map(|lamports| (lamports / LAMPORTS_PER_SOL).abs());
    }

    Some(event)
}

fn is_swap(record: &Value, description: Option<&str>) -> bool {
    if record
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.eq_ignore_ascii_case("swap"))
    {
        return true;
    }
    description.is_some_and(|text| {
        let text = text.to_lowercase();
        ["swap", "bought", "sold"].iter().any(|word| text.contains(word))
    })
}

/// First transfer in `list` sent from or to `owner`.
fn owned_transfer<'a>(record: &'a Value, list: &str, owner: &str) -> Option<&'a Value> {
    record.get(list)?.as_array()?.iter().find(|transfer| {
        ["fromUserAccount", "toUserAccount"]
            .iter()
            .any(|side| transfer.get(*side).and_then(Value::as_str) == Some(owner))
    })
}

fn sol_token(event: &mut WalletEvent) {
    event.token = Some("SOL".to_owned());
    event.token_symbol = Some("SOL".to_owned());
    event.token_name = Some("Solana".to_owned());
}

/// First key of an RPC error object (`{"InstructionError": [...]}`), or the raw value.
fn error_label(err: &Value) -> String {
    match err {
        Value::Object(fields) => fields
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "transaction error".to_owned()),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl ChainIndexer for HeliusIndexer {
    fn activity<'a>(
        &'a self,
        address: &'a WalletAddress,
    ) -> Pin<Box<dyn Future<Output = Result<(ChainActivity, Freshness), SourceError>> + Send + 'a>>
    {
        Box::pin(self.fetch_activity(address))
    }
}
