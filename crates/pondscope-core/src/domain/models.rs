use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::address::{Chain, WalletAddress};
use super::lenient;

/// Transaction category as shown on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Swap,
    Transfer,
    Failed,
}

/// One on-chain transaction, normalized across indexers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEvent {
    pub id: String,
    pub chain: Chain,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub description: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
}

impl WalletEvent {
    pub fn new(
        chain: Chain,
        kind: EventKind,
        hash: impl Into<String>,
        timestamp: i64,
        description: impl Into<String>,
    ) -> Self {
        let hash = hash.into();
        Self {
            id: format!("{}_{hash}", chain.as_str()),
            chain,
            kind,
            description: description.into(),
            timestamp,
            hash,
            amount: None,
            token: None,
            token_symbol: None,
            token_name: None,
            contract_address: None,
            from_address: None,
            to_address: None,
        }
    }
}

/// Per-chain totals computed by an indexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    pub total_swaps: u64,
    pub total_value: f64,
    pub mining_rewards: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainActivity {
    pub chain: Chain,
    pub events: Vec<WalletEvent>,
    pub stats: ChainStats,
}

/// Pond0x profile as reported by the community manifest API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub wallet_address: String,
    pub swaps: Option<u64>,
    pub bx_swaps: u64,
    pub has_twitter: bool,
    pub badges: Vec<String>,
    pub cope: bool,
    pub is_pro: bool,
    /// Days since the Pro subscription was bought.
    pub pro_ago: Option<i64>,
}

impl Manifest {
    /// Marker value for "never bought Pro".
    pub const NO_PRO_PURCHASE: i64 = 999;

    /// Reads a raw manifest object. Missing or mistyped keys take defaults.
    pub fn from_payload(address: &WalletAddress, payload: &Value) -> Option<Self> {
        let fields = payload.as_object()?;
        let field = |key: &str| fields.get(key).unwrap_or(&Value::Null);

        let swaps = lenient::count(field("swaps")).or_else(|| lenient::count(field("proSwapsSol")));

        Some(Self {
            wallet_address: address.as_str().to_owned(),
            swaps,
            bx_swaps: lenient::count(field("proSwapsBx")).unwrap_or(0),
            has_twitter: lenient::truthy(field("hasTwitter")),
            badges: split_badges(field("badges")),
            cope: lenient::truthy(field("cope")),
            is_pro: lenient::truthy(field("isPro")),
            pro_ago: lenient::integer(field("proAgo")),
        })
    }

    /// Manifest synthesized from on-chain activity when the profile API is unreachable.
    pub fn from_chain_activity(address: &WalletAddress, swaps: u64) -> Self {
        Self {
            wallet_address: address.as_str().to_owned(),
            swaps: Some(swaps),
            bx_swaps: 0,
            has_twitter: false,
            badges: Vec::new(),
            cope: false,
            is_pro: false,
            pro_ago: Some(Self::NO_PRO_PURCHASE),
        }
    }
}

fn split_badges(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|badge| !badge.is_empty())
            .map(str::to_owned)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|badge| !badge.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Typed view over the health endpoint's `stats` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HealthStats {
    pub mining_sessions: Option<u64>,
    pub in_mempool: Option<u64>,
    pub sent: Option<u64>,
    pub failed: Option<u64>,
    pub drifted: Option<u64>,
    pub priority: Option<f64>,
    pub max_claim_estimate_usd: Option<f64>,
    pub drift_risk_usd: Option<f64>,
}

/// Health/mining-stats report. Serializes as the upstream payload, untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub raw: Value,
    pub stats: HealthStats,
}

impl HealthReport {
    pub fn from_payload(payload: Value) -> Option<Self> {
        payload.as_object()?;
        let stat = |keys: &[&str]| lenient::path(&payload, keys);

        let stats = HealthStats {
            mining_sessions: stat(&["stats", "mining_sessions"]).and_then(lenient::count),
            in_mempool: stat(&["stats", "in_mempool"]).and_then(lenient::count),
            sent: stat(&["stats", "sent"]).and_then(lenient::count),
            failed: stat(&["stats", "failed"]).and_then(lenient::count),
            drifted: stat(&["stats", "drifted"]).and_then(lenient::count),
            priority: stat(&["stats", "priority"]).and_then(lenient::number),
            max_claim_estimate_usd: stat(&["stats", "estimates", "max_claim_estimate_usd"])
                .and_then(lenient::number),
            drift_risk_usd: stat(&["stats", "estimates", "drift_risk_usd"])
                .and_then(lenient::number),
        };

        Some(Self {
            raw: payload,
            stats,
        })
    }
}

impl Serialize for HealthReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

/// Current mining session state from the official Pond0x API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningStatus {
    pub has_active_mining: bool,
    pub mining_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_details: Option<Value>,
}

impl MiningStatus {
    /// Signatures at or below this length are placeholders, not live sessions.
    pub const MIN_SIGNATURE_LEN: usize = 40;

    pub fn inactive() -> Self {
        Self {
            has_active_mining: false,
            mining_signature: None,
            session_details: None,
        }
    }

    pub fn active(signature: impl Into<String>, session_details: Option<Value>) -> Self {
        Self {
            has_active_mining: true,
            mining_signature: Some(signature.into()),
            session_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> WalletAddress {
        WalletAddress::solana("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").expect("valid")
    }

    #[test]
    fn manifest_normalizes_loose_fields() {
        let payload = json!({
            "proSwapsSol": "120",
            "proSwapsBx": 4,
            "hasTwitter": 1,
            "badges": "whale, early,, ",
            "isPro": true,
            "proAgo": "12",
        });

        let manifest = Manifest::from_payload(&address(), &payload).expect("object");

        assert_eq!(manifest.swaps, Some(120));
        assert_eq!(manifest.bx_swaps, 4);
        assert!(manifest.has_twitter);
        assert_eq!(manifest.badges, vec!["whale", "early"]);
        assert!(!manifest.cope);
        assert!(manifest.is_pro);
        assert_eq!(manifest.pro_ago, Some(12));
    }

    #[test]
    fn manifest_prefers_swaps_over_pro_swaps() {
        let manifest = Manifest::from_payload(&address(), &json!({"swaps": 42, "proSwapsSol": 7}))
            .expect("object");
        assert_eq!(manifest.swaps, Some(42));
    }

    #[test]
    fn empty_manifest_object_takes_defaults() {
        let manifest = Manifest::from_payload(&address(), &json!({})).expect("object");
        assert_eq!(manifest.swaps, None);
        assert!(manifest.badges.is_empty());
        assert!(!manifest.is_pro);
        assert_eq!(manifest.pro_ago, None);
    }

    #[test]
    fn non_object_manifest_is_rejected() {
        assert!(Manifest::from_payload(&address(), &json!("Not Found")).is_none());
    }

    #[test]
    fn fallback_manifest_marks_no_pro_purchase() {
        let manifest = Manifest::from_chain_activity(&address(), 9);
        assert_eq!(manifest.swaps, Some(9));
        assert!(!manifest.is_pro);
        assert_eq!(manifest.pro_ago, Some(999));
    }

    #[test]
    fn health_report_reads_nested_stats_and_keeps_raw_payload() {
        let payload = json!({
            "stats": {
                "mining_sessions": 25,
                "in_mempool": "1",
                "priority": 3.5,
                "estimates": {"max_claim_estimate_usd": 812.4, "drift_risk_usd": "12.5"}
            },
            "extra": "kept"
        });

        let report = HealthReport::from_payload(payload.clone()).expect("object");

        assert_eq!(report.stats.mining_sessions, Some(25));
        assert_eq!(report.stats.in_mempool, Some(1));
        assert_eq!(report.stats.sent, None);
        assert_eq!(report.stats.priority, Some(3.5));
        assert_eq!(report.stats.max_claim_estimate_usd, Some(812.4));
        assert_eq!(report.stats.drift_risk_usd, Some(12.5));
        assert_eq!(serde_json::to_value(&report).expect("serializable"), payload);
    }

    #[test]
    fn events_serialize_with_camel_case_and_type_tag() {
        let mut event = WalletEvent::new(Chain::Ethereum, EventKind::Swap, "0xabc", 1_000, "ERC20: 1 USDC");
        event.token_symbol = Some("USDC".to_owned());

        let value = serde_json::to_value(&event).expect("serializable");

        assert_eq!(value["id"], "eth_0xabc");
        assert_eq!(value["type"], "swap");
        assert_eq!(value["chain"], "eth");
        assert_eq!(value["tokenSymbol"], "USDC");
        assert!(value.get("amount").is_none());
    }
}
