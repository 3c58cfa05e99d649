//! JSON HTTP client shared by the source adapters.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, FetchError, Result};

/// User agent sent with every outbound request (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("external-api-exporter/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper around `reqwest::Client` with a fixed per-call timeout
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: Client,
    timeout: Duration,
}

impl SourceClient {
    /// Create a client whose every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self { client, timeout })
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with query parameters and decode the JSON body as `T`.
    ///
    /// Network errors, timeouts, non-success statuses and schema mismatches
    /// all come back as a [`FetchError`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, FetchError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Connection(e)
        }
    }
}
