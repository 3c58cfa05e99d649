//! Price Adapter
//!
//! Spot prices in USD from the CoinGecko simple price API. One call covers
//! every tracked asset. Each asset is validated on its own, so one missing or
//! malformed quote is skipped without failing the fetch.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::adapters::http::SourceClient;
use crate::config::SourceConfig;
use crate::domain::Fetcher;
use crate::error::FetchError;
use crate::metrics::catalog::{CRYPTO_BTC_USD, CRYPTO_ETH_USD, REQUESTS_TOTAL};
use crate::metrics::Registry;

/// Tracked assets: CoinGecko id and the gauge it feeds
pub const ASSETS: [(&str, &str); 2] = [("bitcoin", CRYPTO_BTC_USD), ("ethereum", CRYPTO_ETH_USD)];

/// Asset id to quote object, decoded loosely so one bad quote stays local
type PriceResponse = HashMap<String, Value>;

/// USD price of one quote, if present and numeric
fn usd_price(quote: &Value) -> Option<f64> {
    quote.get("usd").and_then(Value::as_f64)
}

/// Writes one price gauge per asset present in the response
pub struct PriceFetcher {
    client: SourceClient,
    url: String,
}

impl PriceFetcher {
    /// Create from source configuration
    pub fn new(client: SourceClient, config: &SourceConfig) -> Self {
        Self {
            client,
            url: config.prices_url.clone(),
        }
    }
}

#[async_trait]
impl Fetcher for PriceFetcher {
    fn name(&self) -> &'static str {
        "prices"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.client.timeout())
    }

    #[instrument(skip(self, registry))]
    async fn fetch(&self, registry: &Registry) -> Result<(), FetchError> {
        registry.increment(REQUESTS_TOTAL, &[], 1.0)?;

        let ids: Vec<&str> = ASSETS.iter().map(|(id, _)| *id).collect();
        let query = [
            ("ids", ids.join(",")),
            ("vs_currencies", "usd".to_string()),
        ];
        let response: PriceResponse = self.client.get_json(&self.url, &query).await?;

        for (id, metric) in ASSETS {
            let Some(quote) = response.get(id) else {
                warn!("Price for {} missing from response, keeping last value", id);
                continue;
            };
            match usd_price(quote) {
                Some(price) => {
                    debug!("{} = {} USD", id, price);
                    registry.set(metric, &[], price)?;
                }
                None => warn!("Malformed quote for {}: {}, keeping last value", id, quote),
            }
        }
        Ok(())
    }
}
