//! Field resolution policy.
//!
//! Each output field owns a static, ordered list of candidates. A candidate names
//! the sources it reads and an extractor; the first extractor that yields a value
//! wins, otherwise the field takes `T::default()`. An extractor yields `None` only
//! when its sources failed (or were skipped) or the field is absent from the payload,
//! so a successful source reporting `0` still wins.

use std::collections::BTreeMap;
use std::iter::Sum;

use serde::Serialize;

use crate::boost::MiningBoost;
use crate::data_source::{SourceResult, SourceStatus};
use crate::{
    ChainActivity, ChainStats, HealthReport, Manifest, MiningStatus, SourceId, UtcDateTime,
};

/// Days a Pro subscription lasts.
pub const PRO_SUBSCRIPTION_DAYS: i64 = 30;

const CHAINS: &[SourceId] = &[SourceId::Solana, SourceId::Ethereum];

/// Settled outcome of every source for one aggregate. `None` means skipped.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub manifest: Option<SourceResult<Manifest>>,
    pub health: Option<SourceResult<HealthReport>>,
    pub mining: Option<SourceResult<MiningStatus>>,
    pub solana: Option<SourceResult<ChainActivity>>,
    pub ethereum: Option<SourceResult<ChainActivity>>,
    /// Reference time for relative fields such as the Pro expiry.
    pub resolved_at: UtcDateTime,
}

impl SourceSet {
    pub fn empty(resolved_at: UtcDateTime) -> Self {
        Self {
            manifest: None,
            health: None,
            mining: None,
            solana: None,
            ethereum: None,
            resolved_at,
        }
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()?.payload()
    }

    pub fn health(&self) -> Option<&HealthReport> {
        self.health.as_ref()?.payload()
    }

    pub fn mining(&self) -> Option<&MiningStatus> {
        self.mining.as_ref()?.payload()
    }

    /// Successful chain activities, Ethereum first.
    pub fn chains(&self) -> impl Iterator<Item = &ChainActivity> {
        [&self.ethereum, &self.solana]
            .into_iter()
            .filter_map(|slot| slot.as_ref()?.payload())
    }

    pub fn status(&self, source: SourceId) -> SourceStatus {
        match source {
            SourceId::Manifest => slot_status(&self.manifest),
            SourceId::Health => slot_status(&self.health),
            SourceId::Mining => slot_status(&self.mining),
            SourceId::Solana => slot_status(&self.solana),
            SourceId::Ethereum => slot_status(&self.ethereum),
        }
    }

    pub fn statuses(&self) -> BTreeMap<SourceId, SourceStatus> {
        SourceId::ALL
            .into_iter()
            .map(|source| (source, self.status(source)))
            .collect()
    }
}

fn slot_status<T>(slot: &Option<SourceResult<T>>) -> SourceStatus {
    slot.as_ref()
        .map_or(SourceStatus::Skipped, SourceResult::status)
}

/// One entry of a field's priority list.
pub struct Candidate<T> {
    pub sources: &'static [SourceId],
    pub extract: fn(&SourceSet) -> Option<T>,
}

/// Ordered candidates for one output field.
pub struct FieldRule<T: 'static> {
    pub field: &'static str,
    pub candidates: &'static [Candidate<T>],
}

/// A resolved value and the sources it came from (empty for the default).
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub sources: &'static [SourceId],
}

impl<T: Default> FieldRule<T> {
    pub fn resolve(&self, set: &SourceSet) -> Resolved<T> {
        self.candidates
            .iter()
            .find_map(|candidate| {
                (candidate.extract)(set).map(|value| Resolved {
                    value,
                    sources: candidate.sources,
                })
            })
            .unwrap_or_else(|| Resolved {
                value: T::default(),
                sources: &[],
            })
    }
}

/// Sum over the chains that succeeded; `None` when none did.
fn chain_sum<N: Sum<N>>(set: &SourceSet, pick: fn(&ChainStats) -> N) -> Option<N> {
    let mut chains = set.chains().peekable();
    chains.peek()?;
    Some(chains.map(|activity| pick(&activity.stats)).sum())
}

pub static TOTAL_SWAPS: FieldRule<u64> = FieldRule {
    field: "totalSwaps",
    candidates: &[
        Candidate {
            sources: &[SourceId::Manifest],
            extract: |set| set.manifest()?.swaps,
        },
        Candidate {
            sources: CHAINS,
            extract: |set| chain_sum(set, |stats| stats.total_swaps),
        },
    ],
};

pub static TOTAL_VALUE: FieldRule<f64> = FieldRule {
    field: "totalValue",
    candidates: &[
        Candidate {
            sources: &[SourceId::Health],
            extract: |set| set.health()?.stats.max_claim_estimate_usd,
        },
        Candidate {
            sources: CHAINS,
            extract: |set| chain_sum(set, |stats| stats.total_value),
        },
    ],
};

pub static MAX_CLAIM_ESTIMATE: FieldRule<f64> = FieldRule {
    field: "maxClaimEstimate",
    candidates: &[Candidate {
        sources: &[SourceId::Health],
        extract: |set| set.health()?.stats.max_claim_estimate_usd,
    }],
};

pub static DRIFT_RISK_USD: FieldRule<f64> = FieldRule {
    field: "driftRiskUsd",
    candidates: &[Candidate {
        sources: &[SourceId::Health],
        extract: |set| set.health()?.stats.drift_risk_usd,
    }],
};

pub static MINING_SESSIONS: FieldRule<u64> = FieldRule {
    field: "miningSessions",
    candidates: &[Candidate {
        sources: &[SourceId::Health],
        extract: |set| set.health()?.stats.mining_sessions,
    }],
};

pub static MINING_REWARDS: FieldRule<f64> = FieldRule {
    field: "miningRewards",
    candidates: &[
        Candidate {
            sources: &[SourceId::Health],
            extract: |set| set.health()?.stats.mining_sessions.map(|n| n as f64),
        },
        Candidate {
            sources: CHAINS,
            extract: |set| chain_sum(set, |stats| stats.mining_rewards),
        },
    ],
};

pub static POND_PRO_STATUS: FieldRule<bool> = FieldRule {
    field: "pondProStatus",
    candidates: &[Candidate {
        sources: &[SourceId::Manifest],
        extract: |set| Some(set.manifest()?.is_pro),
    }],
};

pub static POND_PRO_EXPIRY: FieldRule<Option<UtcDateTime>> = FieldRule {
    field: "pondProExpiry",
    candidates: &[Candidate {
        sources: &[SourceId::Manifest],
        extract: |set| {
            let manifest = set.manifest()?;
            // `proAgo` is upstream data; absurd values leave the expiry unset.
            let expiry = manifest
                .pro_ago
                .filter(|_| manifest.is_pro)
                .and_then(|days_ago| PRO_SUBSCRIPTION_DAYS.checked_sub(days_ago))
                .and_then(|days| set.resolved_at.plus_days(days));
            Some(expiry)
        },
    }],
};

pub static HAS_ACTIVE_MINING: FieldRule<bool> = FieldRule {
    field: "hasActiveMining",
    candidates: &[
        Candidate {
            sources: &[SourceId::Mining],
            extract: |set| Some(set.mining()?.has_active_mining),
        },
        Candidate {
            sources: &[SourceId::Health],
            extract: |set| set.health()?.stats.in_mempool.map(|n| n > 0),
        },
    ],
};

pub static BADGES: FieldRule<Vec<String>> = FieldRule {
    field: "badges",
    candidates: &[Candidate {
        sources: &[SourceId::Manifest],
        extract: |set| Some(set.manifest()?.badges.clone()),
    }],
};

/// Merged wallet statistics. Every field is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStats {
    pub total_swaps: u64,
    pub total_value: f64,
    pub max_claim_estimate: f64,
    pub drift_risk_usd: f64,
    pub mining_sessions: u64,
    pub mining_rewards: f64,
    pub pond_pro_status: bool,
    pub pond_pro_expiry: Option<UtcDateTime>,
    pub has_active_mining: bool,
    pub badges: Vec<String>,
    pub mining_boost: MiningBoost,
}

/// Field name to the sources that supplied it.
pub type Provenance = BTreeMap<&'static str, &'static [SourceId]>;

impl WalletStats {
    pub fn resolve(set: &SourceSet) -> (Self, Provenance) {
        let mut provenance = Provenance::new();

        let total_swaps = take(&TOTAL_SWAPS, set, &mut provenance);
        let mining_sessions = take(&MINING_SESSIONS, set, &mut provenance);

        let stats = Self {
            total_swaps,
            total_value: take(&TOTAL_VALUE, set, &mut provenance),
            max_claim_estimate: take(&MAX_CLAIM_ESTIMATE, set, &mut provenance),
            drift_risk_usd: take(&DRIFT_RISK_USD, set, &mut provenance),
            mining_sessions,
            mining_rewards: take(&MINING_REWARDS, set, &mut provenance),
            pond_pro_status: take(&POND_PRO_STATUS, set, &mut provenance),
            pond_pro_expiry: take(&POND_PRO_EXPIRY, set, &mut provenance),
            has_active_mining: take(&HAS_ACTIVE_MINING, set, &mut provenance),
            badges: take(&BADGES, set, &mut provenance),
            mining_boost: MiningBoost::compute(total_swaps, mining_sessions),
        };

        (stats, provenance)
    }
}

fn take<T: Default>(rule: &FieldRule<T>, set: &SourceSet, provenance: &mut Provenance) -> T {
    let resolved = rule.resolve(set);
    provenance.insert(rule.field, resolved.sources);
    resolved.value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{Freshness, SourceError};
    use crate::{Chain, WalletAddress};
    use serde_json::json;

    fn now() -> UtcDateTime {
        UtcDateTime::parse("2024-06-01T00:00:00Z").expect("valid")
    }

    fn ok<T>(payload: T) -> Option<SourceResult<T>> {
        Some(SourceResult::success(payload, Freshness::Fresh))
    }

    fn failed<T>() -> Option<SourceResult<T>> {
        Some(SourceResult::Failure(SourceError::unavailable("down")))
    }

    fn manifest(payload: serde_json::Value) -> Manifest {
        let address =
            WalletAddress::solana("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").expect("valid");
        Manifest::from_payload(&address, &payload).expect("object")
    }

    fn health(payload: serde_json::Value) -> HealthReport {
        HealthReport::from_payload(payload).expect("object")
    }

    fn chain(chain: Chain, total_swaps: u64, total_value: f64) -> ChainActivity {
        ChainActivity {
            chain,
            events: Vec::new(),
            stats: ChainStats {
                total_swaps,
                total_value,
                mining_rewards: 1.5,
            },
        }
    }

    #[test]
    fn all_sources_missing_yields_documented_defaults() {
        let (stats, provenance) = WalletStats::resolve(&SourceSet::empty(now()));

        assert_eq!(stats.total_swaps, 0);
        assert_eq!(stats.total_value, 0.0);
        assert_eq!(stats.max_claim_estimate, 0.0);
        assert!(!stats.pond_pro_status);
        assert_eq!(stats.pond_pro_expiry, None);
        assert!(!stats.has_active_mining);
        assert!(stats.badges.is_empty());
        assert_eq!(stats.mining_boost.boost, 0.0);
        assert!(provenance.values().all(|sources| sources.is_empty()));
        assert_eq!(provenance.len(), 10);
    }

    #[test]
    fn out_of_range_pro_ago_leaves_expiry_unset() {
        for pro_ago in [json!(100_000_000), json!(i64::MIN), json!(i64::MAX)] {
            let mut set = SourceSet::empty(now());
            set.manifest = ok(manifest(json!({"isPro": true, "proAgo": pro_ago})));

            let (stats, provenance) = WalletStats::resolve(&set);

            assert!(stats.pond_pro_status);
            assert_eq!(stats.pond_pro_expiry, None, "proAgo {pro_ago}");
            assert_eq!(provenance["pondProExpiry"], &[SourceId::Manifest][..]);
        }
    }

    #[test]
    fn manifest_swaps_win_over_chain_sum() {
        let mut set = SourceSet::empty(now());
        set.manifest = ok(manifest(json!({"swaps": 42})));
        set.solana = ok(chain(Chain::Solana, 7, 0.0));

        let resolved = TOTAL_SWAPS.resolve(&set);

        assert_eq!(resolved.value, 42);
        assert_eq!(resolved.sources, &[SourceId::Manifest]);
    }

    #[test]
    fn chain_sum_covers_only_successful_chains() {
        let mut set = SourceSet::empty(now());
        set.manifest = failed();
        set.solana = ok(chain(Chain::Solana, 7, 10.0));
        set.ethereum = ok(chain(Chain::Ethereum, 3, 5.5));

        assert_eq!(TOTAL_SWAPS.resolve(&set).value, 10);
        assert_eq!(TOTAL_VALUE.resolve(&set).value, 15.5);
        assert_eq!(MINING_REWARDS.resolve(&set).value, 3.0);

        set.ethereum = failed();
        assert_eq!(TOTAL_SWAPS.resolve(&set).value, 7);
    }

    #[test]
    fn successful_zero_is_not_a_fallthrough() {
        let mut set = SourceSet::empty(now());
        set.manifest = ok(manifest(json!({"swaps": 0})));
        set.solana = ok(chain(Chain::Solana, 7, 0.0));

        assert_eq!(TOTAL_SWAPS.resolve(&set).value, 0);
    }

    #[test]
    fn absent_field_falls_through_to_next_candidate() {
        let mut set = SourceSet::empty(now());
        set.health = ok(health(json!({"stats": {}})));
        set.solana = ok(chain(Chain::Solana, 0, 20.0));

        let resolved = TOTAL_VALUE.resolve(&set);

        assert_eq!(resolved.value, 20.0);
        assert_eq!(resolved.sources, CHAINS);
    }

    #[test]
    fn pro_expiry_counts_down_from_thirty_days() {
        let mut set = SourceSet::empty(now());
        set.manifest = ok(manifest(json!({"isPro": true, "proAgo": 10})));

        let expiry = POND_PRO_EXPIRY.resolve(&set).value.expect("pro user");

        assert_eq!(expiry.format_rfc3339(), "2024-06-21T00:00:00Z");
    }

    #[test]
    fn pro_expiry_is_null_without_pro_or_days() {
        let mut set = SourceSet::empty(now());
        set.manifest = ok(manifest(json!({"isPro": false, "proAgo": 10})));
        assert_eq!(POND_PRO_EXPIRY.resolve(&set).value, None);

        set.manifest = ok(manifest(json!({"isPro": true})));
        assert_eq!(POND_PRO_EXPIRY.resolve(&set).value, None);
    }

    #[test]
    fn active_mining_falls_back_to_mempool_count() {
        let mut set = SourceSet::empty(now());
        set.mining = failed();
        set.health = ok(health(json!({"stats": {"in_mempool": 2}})));

        let resolved = HAS_ACTIVE_MINING.resolve(&set);
        assert!(resolved.value);
        assert_eq!(resolved.sources, &[SourceId::Health]);

        set.mining = ok(MiningStatus::inactive());
        assert!(!HAS_ACTIVE_MINING.resolve(&set).value);
    }

    #[test]
    fn statuses_distinguish_skipped_from_failed() {
        let mut set = SourceSet::empty(now());
        set.manifest = failed();
        set.solana = Some(SourceResult::success(
            chain(Chain::Solana, 0, 0.0),
            Freshness::StaleFromCache,
        ));

        let statuses = set.statuses();

        assert_eq!(statuses[&SourceId::Manifest], SourceStatus::Failed);
        assert_eq!(statuses[&SourceId::Solana], SourceStatus::Stale);
        assert_eq!(statuses[&SourceId::Ethereum], SourceStatus::Skipped);
    }
}
