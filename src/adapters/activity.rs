//! Activity Adapter
//!
//! Counts commits to a GitHub repository over a rolling 24 hour window.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument};

use crate::adapters::http::SourceClient;
use crate::config::SourceConfig;
use crate::domain::Fetcher;
use crate::error::FetchError;
use crate::metrics::catalog::{GITHUB_COMMITS_24H, REQUESTS_TOTAL};
use crate::metrics::Registry;

/// Length of the rolling window, in hours
pub const WINDOW_HOURS: i64 = 24;

/// Page size requested from the API (the count saturates here)
pub const PER_PAGE: u32 = 100;

/// `since` parameter for a window ending at `now`
pub fn window_start(now: DateTime<Utc>) -> String {
    (now - chrono::Duration::hours(WINDOW_HOURS)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Writes the commit count for the last 24 hours
pub struct ActivityFetcher {
    client: SourceClient,
    commits_url: String,
}

impl ActivityFetcher {
    /// Create from source configuration
    pub fn new(client: SourceClient, config: &SourceConfig) -> Self {
        Self {
            client,
            commits_url: format!(
                "{}/repos/{}/commits",
                config.github_api_url.trim_end_matches('/'),
                config.github_repo
            ),
        }
    }

    /// Fetch with an explicit window end
    pub async fn fetch_at(&self, registry: &Registry, now: DateTime<Utc>) -> Result<(), FetchError> {
        registry.increment(REQUESTS_TOTAL, &[], 1.0)?;

        let query = [("since", window_start(now)), ("per_page", PER_PAGE.to_string())];
        let body: serde_json::Value = self.client.get_json(&self.commits_url, &query).await?;

        // The API answers errors (rate limit, bad repo) with an object carrying a message.
        let commits = body.as_array().ok_or_else(|| {
            let detail = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("expected a JSON array");
            FetchError::UnexpectedShape(detail.to_string())
        })?;

        debug!("{} commits since {}", commits.len(), window_start(now));
        registry.set(GITHUB_COMMITS_24H, &[], commits.len() as f64)?;
        Ok(())
    }
}

#[async_trait]
impl Fetcher for ActivityFetcher {
    fn name(&self) -> &'static str {
        "github_activity"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.client.timeout())
    }

    #[instrument(skip(self, registry))]
    async fn fetch(&self, registry: &Registry) -> Result<(), FetchError> {
        self.fetch_at(registry, Utc::now()).await
    }
}
