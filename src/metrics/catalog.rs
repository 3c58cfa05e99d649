//! Metric catalog
//!
//! Every family the exporter exposes, declared once at startup by
//! [`declare_all`]. Fetchers refer to families only through these constants.

use super::registry::{MetricDesc, Registry, RegistryResult};

// Weather
pub const WEATHER_TEMPERATURE: &str = "weather_temperature_celsius";
pub const WEATHER_WINDSPEED: &str = "weather_windspeed_kmh";
pub const WEATHER_CODE: &str = "weather_code";

// Prices
pub const CRYPTO_BTC_USD: &str = "crypto_btc_usd";
pub const CRYPTO_ETH_USD: &str = "crypto_eth_usd";

// Exchange rates
pub const FX_USD_KZT: &str = "fx_usd_kzt";
pub const FX_EUR_KZT: &str = "fx_eur_kzt";

// Activity
pub const GITHUB_COMMITS_24H: &str = "github_prometheus_commits_24h";

// Air quality
pub const AIR_PM25: &str = "external_air_pm25";

// Synthetic
pub const SIMULATED_ACTIVE_USERS: &str = "simulated_active_users";

// Exporter self-metrics
pub const EXPORTER_INFO: &str = "custom_exporter_info";
pub const EXPORTER_UP: &str = "custom_exporter_up";
pub const REQUESTS_TOTAL: &str = "custom_exporter_requests_total";
pub const SOURCE_UP: &str = "custom_exporter_source_up";
pub const FETCH_FAILURES_TOTAL: &str = "custom_exporter_fetch_failures_total";
pub const TICKS_TOTAL: &str = "custom_exporter_ticks_total";
pub const LAST_TICK_DURATION: &str = "custom_exporter_last_tick_duration_seconds";

/// Sentinel written when a measurement is unavailable
pub const UNAVAILABLE: f64 = -1.0;

/// All family descriptors, in exposition order
pub fn descriptors() -> Vec<MetricDesc> {
    vec![
        MetricDesc::info(EXPORTER_INFO, "Information about the custom exporter"),
        MetricDesc::gauge(WEATHER_TEMPERATURE, "Current temperature")
            .with_labels(&["city", "country"]),
        MetricDesc::gauge(WEATHER_WINDSPEED, "Current wind speed")
            .with_labels(&["city", "country"]),
        MetricDesc::gauge(WEATHER_CODE, "Weather code (Open-Meteo)")
            .with_labels(&["city", "country"]),
        MetricDesc::gauge(CRYPTO_BTC_USD, "Bitcoin price USD"),
        MetricDesc::gauge(CRYPTO_ETH_USD, "Ethereum price USD"),
        MetricDesc::gauge(FX_USD_KZT, "USD -> KZT exchange rate"),
        MetricDesc::gauge(FX_EUR_KZT, "EUR -> KZT exchange rate"),
        MetricDesc::gauge(
            GITHUB_COMMITS_24H,
            "Commits in last 24h for prometheus/prometheus",
        ),
        MetricDesc::gauge(
            AIR_PM25,
            "PM2.5 (µg/m3) - external provider (or -1 on fail)",
        )
        .with_labels(&["city"]),
        MetricDesc::gauge(SIMULATED_ACTIVE_USERS, "Simulated active users (synthetic)"),
        MetricDesc::gauge(
            EXPORTER_UP,
            "Custom exporter overall up (1) / partial failure (0)",
        ),
        MetricDesc::counter(REQUESTS_TOTAL, "Total external requests made by exporter"),
        MetricDesc::gauge(SOURCE_UP, "Outcome of the last fetch per source (1 ok, 0 failed)")
            .with_labels(&["source"]),
        MetricDesc::counter(FETCH_FAILURES_TOTAL, "Failed fetches per source")
            .with_labels(&["source"]),
        MetricDesc::counter(TICKS_TOTAL, "Completed collection ticks"),
        MetricDesc::gauge(LAST_TICK_DURATION, "Duration of the last collection tick"),
    ]
}

/// Declare every family
pub fn declare_all(registry: &Registry) -> RegistryResult<()> {
    for desc in descriptors() {
        registry.declare(desc)?;
    }
    Ok(())
}

/// Seed labeled series with their defaults so they are exposed before the
/// first tick: weather at zero, air quality at the sentinel.
pub fn seed_defaults(registry: &Registry, city: &str, country: &str) -> RegistryResult<()> {
    for name in [WEATHER_TEMPERATURE, WEATHER_WINDSPEED, WEATHER_CODE] {
        registry.set(name, &[city, country], 0.0)?;
    }
    registry.set(AIR_PM25, &[city], UNAVAILABLE)
}

/// Seed the per-source up gauge and failure counter at zero, so every source
/// has both series from the first scrape on.
pub fn seed_sources<'a>(
    registry: &Registry,
    sources: impl IntoIterator<Item = &'a str>,
) -> RegistryResult<()> {
    for source in sources {
        registry.set(SOURCE_UP, &[source], 0.0)?;
        registry.increment(FETCH_FAILURES_TOTAL, &[source], 0.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let descriptors = descriptors();
        let names: HashSet<_> = descriptors.iter().map(|d| d.name.clone()).collect();
        assert_eq!(names.len(), descriptors.len());
    }

    #[test]
    fn test_declare_all_and_seed() {
        let registry = Registry::new();
        declare_all(&registry).unwrap();
        seed_defaults(&registry, "Astana", "Kazakhstan").unwrap();

        assert_eq!(registry.len(), descriptors().len());
        assert_eq!(registry.get(AIR_PM25, &["Astana"]), Some(UNAVAILABLE));
        assert_eq!(
            registry.get(WEATHER_TEMPERATURE, &["Astana", "Kazakhstan"]),
            Some(0.0)
        );
        assert_eq!(registry.get(EXPORTER_UP, &[]), Some(0.0));
    }

    #[test]
    fn test_seed_sources_creates_zero_series() {
        let registry = Registry::new();
        declare_all(&registry).unwrap();
        seed_sources(&registry, ["weather", "prices"]).unwrap();

        assert_eq!(registry.get(SOURCE_UP, &["weather"]), Some(0.0));
        assert_eq!(registry.get(FETCH_FAILURES_TOTAL, &["weather"]), Some(0.0));
        assert_eq!(registry.get(FETCH_FAILURES_TOTAL, &["prices"]), Some(0.0));
        assert_eq!(registry.get(FETCH_FAILURES_TOTAL, &["fx"]), None);
    }

    #[test]
    fn test_declare_all_twice_fails() {
        let registry = Registry::new();
        declare_all(&registry).unwrap();
        assert!(declare_all(&registry).is_err());
    }
}
