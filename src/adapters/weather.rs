//! Weather Adapter
//!
//! Current conditions from the Open-Meteo forecast API for a fixed coordinate.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::adapters::http::SourceClient;
use crate::config::SourceConfig;
use crate::domain::Fetcher;
use crate::error::FetchError;
use crate::metrics::catalog::{REQUESTS_TOTAL, WEATHER_CODE, WEATHER_TEMPERATURE, WEATHER_WINDSPEED};
use crate::metrics::Registry;

/// Raw wind speeds at or above this are taken to already be km/h
pub const KMH_THRESHOLD: f64 = 60.0;

/// m/s to km/h
const MS_TO_KMH: f64 = 3.6;

/// Normalize a raw wind speed to km/h.
///
/// Values below [`KMH_THRESHOLD`] are treated as m/s.
pub fn normalize_windspeed(raw: f64) -> f64 {
    if raw < KMH_THRESHOLD {
        raw * MS_TO_KMH
    } else {
        raw
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    windspeed: Option<f64>,
    #[serde(default)]
    weathercode: Option<f64>,
}

/// Validated reading
#[derive(Debug, Clone, Copy, PartialEq)]
struct Reading {
    temperature: f64,
    windspeed_kmh: f64,
    code: f64,
}

impl TryFrom<ForecastResponse> for Reading {
    type Error = FetchError;

    fn try_from(response: ForecastResponse) -> Result<Self, Self::Error> {
        let current = response
            .current_weather
            .ok_or(FetchError::MissingField("current_weather"))?;

        Ok(Self {
            temperature: current
                .temperature
                .ok_or(FetchError::MissingField("current_weather.temperature"))?,
            windspeed_kmh: normalize_windspeed(
                current
                    .windspeed
                    .ok_or(FetchError::MissingField("current_weather.windspeed"))?,
            ),
            code: current
                .weathercode
                .ok_or(FetchError::MissingField("current_weather.weathercode"))?,
        })
    }
}

/// Writes temperature, wind speed and weather code for one city
pub struct WeatherFetcher {
    client: SourceClient,
    url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    city: String,
    country: String,
}

impl WeatherFetcher {
    /// Create from source configuration
    pub fn new(client: SourceClient, config: &SourceConfig) -> Self {
        Self {
            client,
            url: config.weather_url.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone.clone(),
            city: config.city.clone(),
            country: config.country.clone(),
        }
    }
}

#[async_trait]
impl Fetcher for WeatherFetcher {
    fn name(&self) -> &'static str {
        "weather"
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
            ("current_weather", "true".to_string()),
            ("timezone", self.timezone.clone()),
        ];
        let response: ForecastResponse = self.client.get_json(&self.url, &query).await?;
        let reading = Reading::try_from(response)?;

        debug!(
            "Weather in {}: {}°C, {} km/h, code {}",
            self.city, reading.temperature, reading.windspeed_kmh, reading.code
        );

        let labels = [self.city.as_str(), self.country.as_str()];
        registry.set(WEATHER_TEMPERATURE, &labels, reading.temperature)?;
        registry.set(WEATHER_WINDSPEED, &labels, reading.windspeed_kmh)?;
        registry.set(WEATHER_CODE, &labels, reading.code)?;
        Ok(())
    }
}
