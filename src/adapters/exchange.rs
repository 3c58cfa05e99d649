//! Exchange Rate Adapter
//!
//! KZT rates for two base currencies from exchangerate.host. Each base is an
//! independent sub-call: one failing does not stop the other's gauge from
//! being written, but either failing fails the fetch.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::adapters::http::SourceClient;
use crate::config::SourceConfig;
use crate::domain::Fetcher;
use crate::error::FetchError;
use crate::metrics::catalog::{FX_EUR_KZT, FX_USD_KZT, REQUESTS_TOTAL};
use crate::metrics::Registry;

/// Quote currency
pub const QUOTE: &str = "KZT";

/// Base currencies and the gauge each feeds
pub const PAIRS: [(&str, &str); 2] = [("USD", FX_USD_KZT), ("EUR", FX_EUR_KZT)];

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: Option<HashMap<String, f64>>,
}

/// Writes one rate gauge per base currency
pub struct ExchangeRateFetcher {
    client: SourceClient,
    url: String,
}

impl ExchangeRateFetcher {
    /// Create from source configuration
    pub fn new(client: SourceClient, config: &SourceConfig) -> Self {
        Self {
            client,
            url: config.fx_url.clone(),
        }
    }

    async fn fetch_pair(
        &self,
        registry: &Registry,
        base: &str,
        metric: &str,
    ) -> Result<(), FetchError> {
        registry.increment(REQUESTS_TOTAL, &[], 1.0)?;

        let query = [("base", base.to_string()), ("symbols", QUOTE.to_string())];
        let response: LatestResponse = self.client.get_json(&self.url, &query).await?;
        let rate = response
            .rates
            .ok_or(FetchError::MissingField("rates"))?
            .get(QUOTE)
            .copied()
            .ok_or(FetchError::MissingField("rates.KZT"))?;

        if rate <= 0.0 {
            return Err(FetchError::OutOfRange {
                field: "rates.KZT",
                value: rate,
            });
        }

        debug!("{}/{} = {}", base, QUOTE, rate);
        registry.set(metric, &[], rate)?;
        Ok(())
    }
}

#[async_trait]
impl Fetcher for ExchangeRateFetcher {
    fn name(&self) -> &'static str {
        "exchange_rates"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.client.timeout())
    }

    #[instrument(skip(self, registry))]
    async fn fetch(&self, registry: &Registry) -> Result<(), FetchError> {
        let [(usd, usd_metric), (eur, eur_metric)] = PAIRS;
        let (usd_result, eur_result) = tokio::join!(
            self.fetch_pair(registry, usd, usd_metric),
            self.fetch_pair(registry, eur, eur_metric),
        );

        if let Err(e) = &usd_result {
            warn!("{}/{} sub-call failed: {}", usd, QUOTE, e);
        }
        if let Err(e) = &eur_result {
            warn!("{}/{} sub-call failed: {}", eur, QUOTE, e);
        }

        usd_result.and(eur_result)
    }
}
