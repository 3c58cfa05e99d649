//! Air Quality Adapter
//!
//! Hourly PM2.5 from the Open-Meteo air quality API. On any failure the gauge
//! is set to the `-1` sentinel so a missing reading is distinguishable from a
//! stale one.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::adapters::http::SourceClient;
use crate::config::SourceConfig;
use crate::domain::Fetcher;
use crate::error::FetchError;
use crate::metrics::catalog::{AIR_PM25, REQUESTS_TOTAL, UNAVAILABLE};
use crate::metrics::{Registry, RegistryResult};

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    #[serde(default)]
    hourly: Option<Hourly>,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    #[serde(default)]
    pm2_5: Option<Vec<Option<f64>>>,
}

/// Most recent non-null sample of the hourly series
fn latest_sample(response: AirQualityResponse) -> Result<f64, FetchError> {
    let samples = response
        .hourly
        .ok_or(FetchError::MissingField("hourly"))?
        .pm2_5
        .ok_or(FetchError::MissingField("hourly.pm2_5"))?;

    let value = samples
        .into_iter()
        .rev()
        .flatten()
        .next()
        .ok_or(FetchError::Empty)?;

    if value < 0.0 {
        return Err(FetchError::OutOfRange {
            field: "hourly.pm2_5",
            value,
        });
    }
    Ok(value)
}

/// Writes the latest PM2.5 reading, or the sentinel on failure
pub struct AirQualityFetcher {
    client: SourceClient,
    url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    city: String,
}

impl AirQualityFetcher {
    /// Create from source configuration
    pub fn new(client: SourceClient, config: &SourceConfig) -> Self {
        Self {
            client,
            url: config.air_quality_url.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone.clone(),
            city: config.city.clone(),
        }
    }
}

#[async_trait]
impl Fetcher for AirQualityFetcher {
    fn name(&self) -> &'static str {
        "air_quality"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.client.timeout())
    }

    #[instrument(skip(self, registry), fields(city = %self.city))]
    async fn fetch(&self, registry: &Registry) -> Result<(), FetchError> {
        registry.increment(REQUESTS_TOTAL, &[], 1.0)?;

        let query = [
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("hourly", "pm2_5".to_string()),
            ("timezone", self.timezone.clone()),
        ];
        let response: AirQualityResponse = self.client.get_json(&self.url, &query).await?;
        let pm25 = latest_sample(response)?;

        debug!("PM2.5 in {}: {}", self.city, pm25);
        registry.set(AIR_PM25, &[self.city.as_str()], pm25)?;
        Ok(())
    }

    fn on_failure(&self, registry: &Registry) -> RegistryResult<()> {
        registry.set(AIR_PM25, &[self.city.as_str()], UNAVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::{client, registry, sources};
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(body: serde_json::Value) -> Result<f64, FetchError> {
        latest_sample(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn test_latest_sample_skips_trailing_nulls() {
        let value = parse(serde_json::json!({
            "hourly": {"pm2_5": [10.0, 12.5, null, null]}
        }));
        assert_eq!(value.unwrap(), 12.5);
    }

    #[test]
    fn test_latest_sample_empty() {
        assert_matches!(
            parse(serde_json::json!({"hourly": {"pm2_5": []}})),
            Err(FetchError::Empty)
        );
        assert_matches!(
            parse(serde_json::json!({"hourly": {"pm2_5": [null, null]}})),
            Err(FetchError::Empty)
        );
    }

    #[test]
    fn test_latest_sample_missing_fields() {
        assert_matches!(
            parse(serde_json::json!({})),
            Err(FetchError::MissingField("hourly"))
        );
        assert_matches!(
            parse(serde_json::json!({"hourly": {"time": []}})),
            Err(FetchError::MissingField("hourly.pm2_5"))
        );
    }

    #[test]
    fn test_latest_sample_negative() {
        assert_matches!(
            parse(serde_json::json!({"hourly": {"pm2_5": [-3.0]}})),
            Err(FetchError::OutOfRange { .. })
        );
    }

    #[tokio::test]
    async fn test_fetch_writes_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .and(query_param("hourly", "pm2_5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {"time": ["t0", "t1"], "pm2_5": [8.1, 9.4]}
            })))
            .mount(&server)
            .await;

        let registry = registry();
        AirQualityFetcher::new(client(), &sources(&server))
            .fetch(&registry)
            .await
            .unwrap();
        assert_eq!(registry.get(AIR_PM25, &["Astana"]), Some(9.4));
    }

    #[tokio::test]
    async fn test_empty_response_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"hourly": {"pm2_5": []}})),
            )
            .mount(&server)
            .await;

        let registry = registry();
        let fetcher = AirQualityFetcher::new(client(), &sources(&server));
        assert_matches!(fetcher.fetch(&registry).await, Err(FetchError::Empty));
    }

    #[test]
    fn test_on_failure_writes_sentinel() {
        let registry = registry();
        registry.set(AIR_PM25, &["Astana"], 15.0).unwrap();

        let config = SourceConfig::default();
        let fetcher = AirQualityFetcher::new(client(), &config);
        fetcher.on_failure(&registry).unwrap();

        assert_eq!(registry.get(AIR_PM25, &["Astana"]), Some(UNAVAILABLE));
    }
}
