//! Synthetic Adapter
//!
//! A time-derived gauge that needs no network. It keeps the pipeline visibly
//! alive even when every real source is down.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Fetcher;
use crate::error::FetchError;
use crate::metrics::catalog::SIMULATED_ACTIVE_USERS;
use crate::metrics::Registry;

/// Simulated active users at `now`: cycles through 50..=109 once a minute
pub fn simulated_active_users(now: DateTime<Utc>) -> f64 {
    let seconds = now.timestamp().rem_euclid(3600);
    (50 + seconds % 60) as f64
}

/// Writes the simulated active-user gauge
#[derive(Debug, Default)]
pub struct SyntheticFetcher;

impl SyntheticFetcher {
    /// Create the fetcher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Fetcher for SyntheticFetcher {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }

    fn affects_health(&self) -> bool {
        false
    }

    async fn fetch(&self, registry: &Registry) -> Result<(), FetchError> {
        registry.set(SIMULATED_ACTIVE_USERS, &[], simulated_active_users(Utc::now()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::registry;
    use chrono::TimeZone;

    #[test]
    fn test_simulated_values() {
        let at = |s| Utc.timestamp_opt(s, 0).unwrap();
        assert_eq!(simulated_active_users(at(0)), 50.0);
        assert_eq!(simulated_active_users(at(59)), 109.0);
        assert_eq!(simulated_active_users(at(60)), 50.0);
        assert_eq!(simulated_active_users(at(3600 + 17)), 67.0);
    }

    #[test]
    fn test_simulated_range() {
        for s in 0..7200 {
            let value = simulated_active_users(Utc.timestamp_opt(1_700_000_000 + s, 0).unwrap());
            assert!((50.0..=109.0).contains(&value));
        }
    }

    #[tokio::test]
    async fn test_fetch_always_succeeds() {
        let registry = registry();
        let fetcher = SyntheticFetcher::new();

        fetcher.fetch(&registry).await.unwrap();

        let value = registry.get(SIMULATED_ACTIVE_USERS, &[]).unwrap();
        assert!((50.0..=109.0).contains(&value));
        assert!(!fetcher.affects_health());
        assert!(fetcher.timeout().is_none());
    }
}
