use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use super::{PriceFeed, PriceQuote};
use crate::error::TrackerError;

pub const DEFAULT_API_URL: &str = "https://www.goldapi.io/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// GoldAPI spot response (only the fields we read)
#[derive(Debug, Deserialize)]
struct GoldApiResponse {
    price_gram_24k: Option<f64>,
    timestamp: Option<i64>,
    error: Option<String>,
}

/// Spot price client for GoldAPI-compatible endpoints (`GET {base}/XAU/USD`)
pub struct GoldApiFeed {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoldApiFeed {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("goldtrack/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn spot_url(&self) -> String {
        format!("{}/XAU/USD", self.base_url)
    }
}

fn upstream(msg: String) -> anyhow::Error {
    TrackerError::Upstream(msg).into()
}

/// Turn a GoldAPI response body into a quote
fn parse_response(body: &str, received_at: DateTime<Utc>) -> Result<PriceQuote> {
    let data: GoldApiResponse = serde_json::from_str(body)
        .map_err(|e| upstream(format!("unreadable GoldAPI response: {}", e)))?;

    if let Some(error) = data.error {
        return Err(upstream(format!("GoldAPI error: {}", error)));
    }

    let price = data
        .price_gram_24k
        .ok_or_else(|| upstream("GoldAPI response has no per-gram price".to_string()))?;
    let price = Decimal::from_f64_retain(price)
        .ok_or_else(|| upstream(format!("invalid price value {}", price)))?;

    let timestamp = data
        .timestamp
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(received_at);

    PriceQuote::new(price, timestamp)
}

#[async_trait]
impl PriceFeed for GoldApiFeed {
    async fn fetch_spot_price(&self) -> Result<PriceQuote> {
        let url = self.spot_url();
        info!("Fetching gold spot price from {}", url);

        let response = self
            .client
            .get(&url)
            .header("x-access-token", &self.api_key)
            .send()
            .await
            .map_err(|e| upstream(format!("request to GoldAPI failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| upstream(format!("failed to read GoldAPI response: {}", e)))?;

        if !status.is_success() {
            return Err(upstream(format!(
                "GoldAPI returned error status {}: {}",
                status,
                body.trim()
            )));
        }

        parse_response(&body, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_response_reads_gram_price() {
        let body = r#"{
            "timestamp": 1760608800,
            "metal": "XAU",
            "currency": "USD",
            "price": 4210.35,
            "price_gram_24k": 135.3671,
            "price_gram_22k": 124.0865
        }"#;
        let quote = parse_response(body, Utc::now()).unwrap();

        assert_eq!(quote.price_per_gram_usd, dec!(135.37));
        assert_eq!(quote.timestamp.timestamp(), 1760608800);
    }

    #[test]
    fn test_parse_response_without_timestamp_uses_receipt_time() {
        let received = Utc::now();
        let quote = parse_response(r#"{"price_gram_24k": 60}"#, received).unwrap();
        assert_eq!(quote.timestamp, received);
        assert_eq!(quote.price_per_gram_usd, dec!(60));
    }

    #[test]
    fn test_parse_response_errors_are_upstream() {
        for body in [
            r#"{"error": "Invalid API key"}"#,
            r#"{"metal": "XAU"}"#,
            "not json",
            r#"{"price_gram_24k": 0}"#,
        ] {
            let err = parse_response(body, Utc::now()).unwrap_err();
            assert!(
                matches!(
                    TrackerError::kind_of(&err),
                    Some(TrackerError::Upstream(_))
                ),
                "body {:?} gave {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn test_spot_url_trims_trailing_slash() {
        let feed = GoldApiFeed::new("https://example.test/api/", "key").unwrap();
        assert_eq!(feed.spot_url(), "https://example.test/api/XAU/USD");
    }
}
