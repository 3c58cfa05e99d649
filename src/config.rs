//! Exporter configuration
//!
//! Read once at process start. The binary fills these from CLI flags and
//! environment variables; tests build them directly.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

// =============================================================================
// Source Configuration
// =============================================================================

/// Fixed identifiers and endpoints used by the fetchers
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Weather/air-quality coordinate latitude
    pub latitude: f64,
    /// Weather/air-quality coordinate longitude
    pub longitude: f64,
    /// City label value
    pub city: String,
    /// Country label value
    pub country: String,
    /// Timezone passed to Open-Meteo
    pub timezone: String,
    /// Repository whose commits are counted, as `owner/name`
    pub github_repo: String,
    /// Open-Meteo forecast endpoint
    pub weather_url: String,
    /// Open-Meteo air quality endpoint
    pub air_quality_url: String,
    /// CoinGecko simple price endpoint
    pub prices_url: String,
    /// exchangerate.host latest endpoint
    pub fx_url: String,
    /// GitHub REST API base URL
    pub github_api_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            latitude: 51.1694,
            longitude: 71.4491,
            city: "Astana".to_string(),
            country: "Kazakhstan".to_string(),
            timezone: "Asia/Almaty".to_string(),
            github_repo: "prometheus/prometheus".to_string(),
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            air_quality_url: "https://air-quality-api.open-meteo.com/v1/air-quality".to_string(),
            prices_url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            fx_url: "https://api.exchangerate.host/latest".to_string(),
            github_api_url: "https://api.github.com".to_string(),
        }
    }
}

impl SourceConfig {
    /// Point every endpoint at one base URL (used with fake servers)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            weather_url: format!("{}/v1/forecast", base),
            air_quality_url: format!("{}/v1/air-quality", base),
            prices_url: format!("{}/api/v3/simple/price", base),
            fx_url: format!("{}/latest", base),
            github_api_url: base.to_string(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Exporter Configuration
// =============================================================================

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Exposition server bind address
    pub listen_addr: String,

    /// Interval between collection ticks
    pub interval: Duration,

    /// Per-call deadline for each fetcher. The orchestrator aborts a fetch
    /// still running when it elapses.
    pub fetch_timeout: Duration,

    /// Source identifiers and endpoints
    pub sources: SourceConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            interval: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(10),
            sources: SourceConfig::default(),
        }
    }
}

impl ExporterConfig {
    /// Reject settings the scheduler or server cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::Config("collection interval must be positive".into()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::Config("fetch timeout must be positive".into()));
        }
        if self.fetch_timeout >= self.interval {
            return Err(Error::Config(format!(
                "fetch timeout ({:?}) must be shorter than the interval ({:?})",
                self.fetch_timeout, self.interval
            )));
        }
        self.socket_addr()?;
        if !self.sources.github_repo.contains('/') {
            return Err(Error::Config(format!(
                "github repo must be owner/name, got '{}'",
                self.sources.github_repo
            )));
        }
        Ok(())
    }

    /// Parsed bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address '{}': {}", self.listen_addr, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExporterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval, Duration::from_secs(20));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ExporterConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_timeout_must_be_shorter_than_interval() {
        let config = ExporterConfig {
            interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("shorter"));
    }

    #[test]
    fn test_bad_listen_addr() {
        let config = ExporterConfig {
            listen_addr: "not-an-addr".into(),
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_bad_repo() {
        let mut config = ExporterConfig::default();
        config.sources.github_repo = "prometheus".into();
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_with_base_url() {
        let sources = SourceConfig::with_base_url("http://127.0.0.1:9999/");
        assert_eq!(sources.weather_url, "http://127.0.0.1:9999/v1/forecast");
        assert_eq!(sources.fx_url, "http://127.0.0.1:9999/latest");
        assert_eq!(sources.github_api_url, "http://127.0.0.1:9999");
        assert_eq!(sources.city, "Astana");
    }
}
