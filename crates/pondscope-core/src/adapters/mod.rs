//! Upstream source adapters.
//!
//! Each adapter builds request descriptors for one API, runs them through the shared
//! [`CachedFetcher`](crate::CachedFetcher) and normalizes the payload into domain types.

mod alchemy;
mod health;
mod helius;
mod manifest;
mod mining;

pub use alchemy::AlchemyIndexer;
pub use health::HealthSource;
pub use helius::HeliusIndexer;
pub use manifest::ManifestSource;
pub use mining::MiningSource;

/// `{base}/{path}/{segment}` with the segment percent-encoded.
pub(crate) fn endpoint(base: &str, path: &str, segment: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        path.trim_matches('/'),
        urlencoding::encode(segment)
    )
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        assert_eq!(
            endpoint("https://a.test/api/", "/manifest/", "abc"),
            "https://a.test/api/manifest/abc"
        );
        assert_eq!(
            endpoint("https://a.test/api", "user/minesession", "c2ln+/="),
            "https://a.test/api/user/minesession/c2ln%2B%2F%3D"
        );
    }

    #[test]
    fn cents_rounding() {
        assert_eq!(round_cents(12.345_6), 12.35);
        assert_eq!(round_cents(0.0), 0.0);
    }
}
