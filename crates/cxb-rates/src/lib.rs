//! Upstream exchange-rate API adapter.
//!
//! Implements the `cxb-core` RateClient port over the provider's
//! `/v1/convert` and `/v1/live` endpoints. No retries; failures map to
//! `Error::Upstream` and propagate to the caller.

use std::time::Duration;

use async_trait::async_trait;

use cxb_core::{
    errors::Error,
    rates::{Conversion, LiveRates, RateClient},
    Result,
};

#[derive(Clone, Debug)]
pub struct AbstractRateClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl AbstractRateClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: trim_trailing_slash(base_url.into()),
            http,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request to {path} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "{path} returned {status}: {}",
                snippet(&body)
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| Error::Upstream(format!("malformed response from {path}: {e}")))
    }
}

#[async_trait]
impl RateClient for AbstractRateClient {
    async fn convert(&self, base: &str, target: &str, amount: Option<f64>) -> Result<Conversion> {
        let mut params = vec![
            ("base", base.to_string()),
            ("target", target.to_string()),
        ];
        if let Some(amount) = amount {
            params.push(("base_amount", amount.to_string()));
        }
        self.get_json("/v1/convert", &params).await
    }

    async fn live_rates(&self, base: &str, targets: &[String]) -> Result<LiveRates> {
        let mut params = vec![("base", base.to_string())];
        if !targets.is_empty() {
            params.push(("target", targets.join(",")));
        }
        self.get_json("/v1/live", &params).await
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn snippet(body: &str) -> String {
    let cleaned = body.replace('\n', " ");
    if cleaned.len() <= 200 {
        return cleaned;
    }
    let cut: String = cleaned.chars().take(200).collect();
    format!("{cut}...")
}
