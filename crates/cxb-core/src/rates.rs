//! Upstream exchange-rate API port.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;

/// Response of a single-pair conversion.
///
/// `base_amount` / `converted_amount` are echoed by the upstream when a base
/// amount was sent with the request.
#[derive(Clone, Debug, Deserialize)]
pub struct Conversion {
    pub exchange_rate: f64,
    #[serde(default)]
    pub base_amount: Option<f64>,
    #[serde(default)]
    pub converted_amount: Option<f64>,
}

/// Response of a multi-pair lookup: target code → rate.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LiveRates {
    pub exchange_rates: HashMap<String, f64>,
}

impl LiveRates {
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.exchange_rates.get(code).copied()
    }
}

/// Hexagonal port for the upstream rate API.
///
/// No retries and no caching here; callers decide how failures surface.
#[async_trait]
pub trait RateClient: Send + Sync {
    /// Rate for one base/target pair, optionally converting `amount`.
    async fn convert(&self, base: &str, target: &str, amount: Option<f64>) -> Result<Conversion>;

    /// Rates from `base` to each of `targets`. An empty `targets` slice asks
    /// the upstream for every rate it has for `base`.
    async fn live_rates(&self, base: &str, targets: &[String]) -> Result<LiveRates>;
}
