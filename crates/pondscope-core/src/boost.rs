//! Mining rig boost.
//!
//! `boost = swaps / 6 - 3 * sessions`, clamped to `[0, 615]`. Both constants are
//! fixed by the Pond0x reward rules.

use serde::Serialize;

pub const MAX_BOOST: f64 = 615.0;
pub const SWAPS_PER_BOOST_POINT: f64 = 6.0;
pub const BOOST_PER_SESSION: f64 = -3.0;

/// Boost derived from resolved swap and session counts, plus the distance to either bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningBoost {
    /// Clamped to `[0, MAX_BOOST]`, rounded to cents.
    pub boost: f64,
    /// Unclamped value, rounded to cents.
    pub raw_boost: f64,
    pub swaps_needed_for_615: u64,
    pub sessions_until_615: u64,
    pub sessions_until_0: u64,
}

impl MiningBoost {
    pub fn compute(total_swaps: u64, mining_sessions: u64) -> Self {
        let swaps = total_swaps as f64;
        let session_boost = mining_sessions as f64 * BOOST_PER_SESSION;
        let raw = swaps / SWAPS_PER_BOOST_POINT + session_boost;

        let swaps_for_max = ((MAX_BOOST - session_boost) * SWAPS_PER_BOOST_POINT).ceil() - swaps;
        let per_session = BOOST_PER_SESSION.abs();

        Self {
            boost: cents(raw.clamp(0.0, MAX_BOOST)),
            raw_boost: cents(raw),
            swaps_needed_for_615: non_negative(swaps_for_max),
            sessions_until_615: non_negative(((raw - MAX_BOOST) / per_session).ceil()),
            sessions_until_0: non_negative((raw / per_session).ceil()),
        }
    }
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn non_negative(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_at_the_upper_bound() {
        let boost = MiningBoost::compute(3_690, 0);
        assert_eq!(boost.boost, 615.0);
        assert_eq!(boost.raw_boost, 615.0);
        assert_eq!(boost.swaps_needed_for_615, 0);
        assert_eq!(boost.sessions_until_615, 0);
        assert_eq!(boost.sessions_until_0, 205);
    }

    #[test]
    fn clamps_negative_boost_to_zero() {
        let boost = MiningBoost::compute(0, 300);
        assert_eq!(boost.boost, 0.0);
        assert_eq!(boost.raw_boost, -900.0);
        assert_eq!(boost.sessions_until_0, 0);
        // (615 + 900) * 6
        assert_eq!(boost.swaps_needed_for_615, 9_090);
    }

    #[test]
    fn above_the_cap_counts_sessions_back_down() {
        let boost = MiningBoost::compute(4_000, 1);
        // 4000 / 6 - 3 = 663.67
        assert_eq!(boost.boost, 615.0);
        assert_eq!(boost.raw_boost, 663.67);
        assert_eq!(boost.sessions_until_615, 17);
        assert_eq!(boost.sessions_until_0, 222);
    }

    #[test]
    fn fractional_boost_is_rounded_to_cents() {
        let boost = MiningBoost::compute(100, 2);
        // 16.666.. - 6
        assert_eq!(boost.boost, 10.67);
        assert_eq!(boost.swaps_needed_for_615, 3_626);
    }

    #[test]
    fn serializes_in_camel_case() {
        let value = serde_json::to_value(MiningBoost::compute(6, 0)).expect("serializable");
        assert_eq!(value["boost"], 1.0);
        assert_eq!(value["swapsNeededFor615"], 3_684);
        assert_eq!(value["sessionsUntil0"], 1);
    }
}
