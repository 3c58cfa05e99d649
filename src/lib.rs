//! External API Exporter
//!
//! A Prometheus exporter that polls a handful of public HTTP APIs on a fixed
//! interval, normalizes their responses into gauges, and serves the result in
//! the text exposition format. A failing source never takes the others down;
//! it only lowers the overall `custom_exporter_up` gauge.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     External API Exporter                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │  Scheduler   │───▶│ Orchestrator │───▶│   Fetchers   │       │
//! │  │  (interval)  │    │   (tick)     │    │  (adapters)  │       │
//! │  └──────────────┘    └──────────────┘    └──────┬───────┘       │
//! │                                                 │ write         │
//! │  ┌──────────────┐  snapshot  ┌──────────────────▼───────┐       │
//! │  │   Server     │◀───────────│        Registry          │       │
//! │  │  (/metrics)  │            │                          │       │
//! │  └──────────────┘            └──────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - One fetcher per external source
//! - [`config`] - Exporter and source configuration
//! - [`controller`] - Tick orchestration and the periodic scheduler
//! - [`domain`] - The fetcher port and outcome types
//! - [`error`] - Error types
//! - [`metrics`] - Registry, catalog and text exposition
//! - [`server`] - HTTP exposition and probe endpoints

pub mod adapters;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod server;

use std::sync::Arc;

// Re-export commonly used types
pub use config::{ExporterConfig, SourceConfig};
pub use controller::{Orchestrator, Scheduler, SchedulerState};
pub use domain::{FetchOutcome, Fetcher, SourceReport, TickReport};
pub use error::{Error, FetchError, RegistryError, Result};
pub use metrics::{render, Registry, Snapshot};
pub use server::MetricsServer;

// =============================================================================
// Build Info
// =============================================================================

/// Crate version, reported in `custom_exporter_info`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate authors, reported in `custom_exporter_info`
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Upstream providers, reported in `custom_exporter_info`
pub const SOURCES: &str = "open-meteo,coingecko,exchangerate.host,github,air-quality-open-meteo";

// =============================================================================
// Wiring
// =============================================================================

/// Registry with every family declared, defaults seeded and build info set
pub fn build_registry(sources: &SourceConfig) -> Result<Registry> {
    let registry = Registry::new();
    metrics::catalog::declare_all(&registry)?;
    metrics::catalog::seed_defaults(&registry, &sources.city, &sources.country)?;
    registry.set_info(
        metrics::catalog::EXPORTER_INFO,
        &[("version", VERSION), ("author", AUTHOR), ("sources", SOURCES)],
    )?;
    Ok(registry)
}

/// Orchestrator over the standard fetcher set
pub fn build_orchestrator(config: &ExporterConfig, registry: Arc<Registry>) -> Result<Orchestrator> {
    let fetchers = adapters::standard_fetchers(&config.sources, config.fetch_timeout)?;
    Ok(Orchestrator::new(registry, fetchers, config.fetch_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::catalog::{AIR_PM25, EXPORTER_INFO, WEATHER_TEMPERATURE};

    #[test]
    fn test_build_registry() {
        let registry = build_registry(&SourceConfig::default()).unwrap();
        let snapshot = registry.snapshot();

        let info = snapshot.family(EXPORTER_INFO).unwrap().info.clone().unwrap();
        assert!(info.contains(&("version".to_string(), VERSION.to_string())));
        assert!(info.contains(&("sources".to_string(), SOURCES.to_string())));
        assert_eq!(snapshot.value(AIR_PM25, &["Astana"]), Some(-1.0));
        assert_eq!(snapshot.value(WEATHER_TEMPERATURE, &["Astana", "Kazakhstan"]), Some(0.0));
    }

    #[test]
    fn test_build_orchestrator() {
        let config = ExporterConfig::default();
        let registry = Arc::new(build_registry(&config.sources).unwrap());
        let orchestrator = build_orchestrator(&config, registry).unwrap();
        assert_eq!(orchestrator.fetcher_count(), 6);
    }
}
