use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

use crate::adapters::endpoint;
use crate::data_source::{Freshness, SourceError};
use crate::fetch::CachedFetcher;
use crate::http_client::HttpRequest;
use crate::{MiningStatus, WalletAddress};

/// Official Pond0x mining API.
///
/// The session endpoint answers with the signature of the wallet's live mining
/// session. A live signature unlocks a second call for the session details, keyed
/// by `base64("{signature}:{address}")`.
#[derive(Debug, Clone)]
pub struct MiningSource {
    fetcher: CachedFetcher,
    base_url: String,
    timeout_ms: u64,
}

impl MiningSource {
    pub fn new(fetcher: CachedFetcher, base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    fn request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_header("origin", "https://pond0x.com")
            .with_header("referer", "https://pond0x.com/")
            .with_timeout_ms(self.timeout_ms)
    }

    pub fn session_request(&self, address: &WalletAddress) -> HttpRequest {
        self.request(endpoint(
            &self.base_url,
            "solana/mining/session",
            address.as_str(),
        ))
    }

    pub fn detail_request(&self, signature: &str, address: &WalletAddress) -> HttpRequest {
        let token = STANDARD.encode(format!("{signature}:{address}"));
        self.request(endpoint(&self.base_url, "user/minesession", &token))
    }

    pub async fn fetch(
        &self,
        address: &WalletAddress,
    ) -> Result<(MiningStatus, Freshness), SourceError> {
        let fetched = self.fetcher.fetch(self.session_request(address), None).await?;
        let freshness = Freshness::of(&fetched);

        let Some(signature) = live_signature(&fetched.data) else {
            return Ok((MiningStatus::inactive(), freshness));
        };

        match self
            .fetcher
            .fetch(self.detail_request(signature, address), None)
            .await
        {
            Ok(detail) => {
                let freshness = freshness.combine(Freshness::of(&detail));
                Ok((MiningStatus::active(signature, Some(detail.data)), freshness))
            }
            Err(error) => {
                debug!(%address, error = %error, "mining session details unavailable");
                Ok((MiningStatus::active(signature, None), freshness))
            }
        }
    }
}

fn live_signature(data: &Value) -> Option<&str> {
    data.as_str()
        .map(str::trim)
        .filter(|signature| signature.len() > MiningStatus::MIN_SIGNATURE_LEN)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{CacheStore, RetryConfig, ScriptedHttpClient};

    const ADDR: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const SIG: &str =
        "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";

    fn source(http: &ScriptedHttpClient) -> MiningSource {
        let fetcher = CachedFetcher::new(
            Arc::new(http.clone()),
            CacheStore::with_default_ttl(),
            RetryConfig::no_retry(),
        );
        MiningSource::new(fetcher, "https://pond.test/api", 10_000)
    }

    fn address() -> WalletAddress {
        WalletAddress::solana(ADDR).expect("valid")
    }

    #[tokio::test]
    async fn live_signature_fetches_session_details() {
        let http = ScriptedHttpClient::new();
        http.respond("https://pond.test/api/solana/mining/session/", 200, SIG)
            .respond(
                "https://pond.test/api/user/minesession/",
                200,
                r#"{"boost":12,"status":"mining"}"#,
            );

        let (status, freshness) = source(&http).fetch(&address()).await.expect("mining");

        assert_eq!(freshness, Freshness::Fresh);
        assert!(status.has_active_mining);
        assert_eq!(status.mining_signature.as_deref(), Some(SIG));
        assert_eq!(status.session_details.expect("details")["boost"], 12);

        let requests = http.requests();
        let token = requests[1].url.rsplit('/').next().expect("token segment");
        let decoded = STANDARD
            .decode(urlencoding::decode(token).expect("utf-8").as_bytes())
            .expect("base64");
        assert_eq!(String::from_utf8(decoded).expect("utf-8"), format!("{SIG}:{ADDR}"));
    }

    #[tokio::test]
    async fn json_quoted_signature_is_accepted() {
        let http = ScriptedHttpClient::new();
        http.respond(
            "https://pond.test/api/solana/mining/session/",
            200,
            format!("\"{SIG}\""),
        );

        let (status, _) = source(&http).fetch(&address()).await.expect("mining");

        assert!(status.has_active_mining);
        assert!(status.session_details.is_none(), "unrouted detail call degrades to no details");
    }

    #[tokio::test]
    async fn short_or_structured_replies_mean_no_live_session() {
        let http = ScriptedHttpClient::new();
        http.respond("https://pond.test/api/solana/mining/session/", 200, "pending");

        let (status, _) = source(&http).fetch(&address()).await.expect("mining");

        assert_eq!(status, MiningStatus::inactive());
        assert_eq!(http.request_count("https://pond.test/api/user/"), 0);
    }

    #[tokio::test]
    async fn failed_session_call_is_an_error() {
        let http = ScriptedHttpClient::new();
        http.fail("https://pond.test/api/solana/mining/session/", "connection reset");

        assert!(source(&http).fetch(&address()).await.is_err());
    }
}
