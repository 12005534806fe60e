use crate::adapters::endpoint;
use crate::data_source::{Freshness, SourceError};
use crate::fetch::CachedFetcher;
use crate::http_client::HttpRequest;
use crate::{HealthReport, WalletAddress};

/// Community health/mining-stats API (`{base}/health/{address}`).
#[derive(Debug, Clone)]
pub struct HealthSource {
    fetcher: CachedFetcher,
    base_url: String,
    timeout_ms: u64,
}

impl HealthSource {
    pub fn new(fetcher: CachedFetcher, base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    pub fn request(&self, address: &WalletAddress) -> HttpRequest {
        HttpRequest::get(endpoint(&self.base_url, "health", address.as_str()))
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms)
    }

    pub async fn fetch(
        &self,
        address: &WalletAddress,
    ) -> Result<(HealthReport, Freshness), SourceError> {
        let fetched = self.fetcher.fetch(self.request(address), None).await?;
        let freshness = Freshness::of(&fetched);

        let report = HealthReport::from_payload(fetched.data)
            .ok_or_else(|| SourceError::decode(format!("health for '{address}' is not a JSON object")))?;

        Ok((report, freshness))
    }
}
