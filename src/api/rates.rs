//! Implements the `RateSource` trait over HTTP and over the bundled rates.

use crate::api::RateSource;
use crate::model::{CurrencyRates, RateResponse};
use crate::Result;
use anyhow::Context;
use url::Url;

/// Fetches `{base, date, rates}` JSON from a rate service such as `https://api.frankfurter.app`.
/// The base currency is passed as the `from` query parameter.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpRateSource {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid rates URL '{url}'"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }
}

#[async_trait::async_trait]
impl RateSource for HttpRateSource {
    async fn fetch(&self, base: &str) -> Result<RateResponse> {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("from", base);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to send rates request to {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Rate service returned status {}: {}", status, body);
        }

        let body = response
            .text()
            .await
            .context("Failed to read the rate service response")?;
        serde_json::from_str(&body).context("Failed to parse the rate service response")
    }
}

/// Serves the rates bundled with the app. Used in test mode so nothing goes over the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledRates;

#[async_trait::async_trait]
impl RateSource for BundledRates {
    async fn fetch(&self, _base: &str) -> Result<RateResponse> {
        let bundled = CurrencyRates::default();
        Ok(RateResponse {
            base: bundled.base,
            date: bundled.updated_at,
            rates: bundled.rates,
        })
    }
}

#[test]
fn test_http_rate_source_rejects_bad_url() {
    assert!(HttpRateSource::new("not a url").is_err());
    assert!(HttpRateSource::new("https://api.frankfurter.app/latest").is_ok());
}
