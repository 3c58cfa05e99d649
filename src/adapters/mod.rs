//! Source Adapters
//!
//! One [`Fetcher`] implementation per external data source, plus the shared
//! JSON HTTP client.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Fetcher (Port)                           │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ Weather │ Prices │ ExchangeRates │ Activity │ AirQuality   │ │
//! │  │ Synthetic                 SourceClient (reqwest)           │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod activity;
mod air_quality;
mod exchange;
pub mod http;
mod prices;
mod synthetic;
mod weather;

use std::sync::Arc;
use std::time::Duration;

pub use activity::ActivityFetcher;
pub use air_quality::AirQualityFetcher;
pub use exchange::ExchangeRateFetcher;
pub use http::SourceClient;
pub use prices::PriceFetcher;
pub use synthetic::{simulated_active_users, SyntheticFetcher};
pub use weather::{normalize_windspeed, WeatherFetcher};

use crate::config::SourceConfig;
use crate::domain::Fetcher;
use crate::error::Result;

/// Build the standard fetcher set, in collection order
pub fn standard_fetchers(
    config: &SourceConfig,
    fetch_timeout: Duration,
) -> Result<Vec<Arc<dyn Fetcher>>> {
    let client = SourceClient::new(fetch_timeout)?;

    Ok(vec![
        Arc::new(WeatherFetcher::new(client.clone(), config)),
        Arc::new(PriceFetcher::new(client.clone(), config)),
        Arc::new(ExchangeRateFetcher::new(client.clone(), config)),
        Arc::new(ActivityFetcher::new(client.clone(), config)),
        Arc::new(AirQualityFetcher::new(client, config)),
        Arc::new(SyntheticFetcher::new()),
    ])
}
