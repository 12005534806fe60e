use crate::adapters::endpoint;
use crate::data_source::{Freshness, SourceError};
use crate::fetch::CachedFetcher;
use crate::http_client::HttpRequest;
use crate::{Manifest, WalletAddress};

/// Community manifest API (`{base}/manifest/{address}`).
#[derive(Debug, Clone)]
pub struct ManifestSource {
    fetcher: CachedFetcher,
    base_url: String,
    timeout_ms: u64,
}

impl ManifestSource {
    pub fn new(fetcher: CachedFetcher, base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    pub fn request(&self, address: &WalletAddress) -> HttpRequest {
        HttpRequest::get(endpoint(&self.base_url, "manifest", address.as_str()))
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms)
    }

    pub async fn fetch(
        &self,
        address: &WalletAddress,
    ) -> Result<(Manifest, Freshness), SourceError> {
        let fetched = self.fetcher.fetch(self.request(address), None).await?;
        let freshness = Freshness::of(&fetched);

        let manifest = Manifest::from_payload(address, &fetched.data).ok_or_else(|| {
            SourceError::decode(format!(
                "manifest for '{address}' is not a JSON object: {}",
                preview(&fetched.data)
            ))
        })?;

        Ok((manifest, freshness))
    }
}

fn preview(data: &serde_json::Value) -> String {
    let mut text = data.to_string();
    if text.len() > 80 {
        let cut = (0..=80).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        text.truncate(cut);
        text.push_str("...");
    }
    text
}
