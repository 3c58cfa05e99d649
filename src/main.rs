//! External API Exporter
//!
//! Polls public APIs on a fixed interval and serves the results for scraping.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     External API Exporter                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │  Scheduler   │───▶│ Orchestrator │───▶│   Registry   │       │
//! │  │  (interval)  │    │   (tick)     │    │              │       │
//! │  └──────────────┘    └──────────────┘    └──────┬───────┘       │
//! │                                                 ▼               │
//! │                                          ┌──────────────┐       │
//! │                                          │    Server    │       │
//! │                                          │  (/metrics)  │       │
//! │                                          └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use external_api_exporter::error::{Error, Result};
use external_api_exporter::{
    build_orchestrator, build_registry, ExporterConfig, MetricsServer, Scheduler, SourceConfig,
    VERSION,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// External API Exporter - public API data as Prometheus metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Exposition server bind address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    listen_addr: String,

    /// Collection interval in seconds
    #[arg(long, env = "COLLECT_INTERVAL_SECONDS", default_value = "20")]
    interval_seconds: u64,

    /// Per-source fetch timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECONDS", default_value = "10")]
    fetch_timeout_seconds: u64,

    /// Weather and air quality latitude
    #[arg(long, env = "WEATHER_LATITUDE", default_value = "51.1694", allow_hyphen_values = true)]
    latitude: f64,

    /// Weather and air quality longitude
    #[arg(long, env = "WEATHER_LONGITUDE", default_value = "71.4491", allow_hyphen_values = true)]
    longitude: f64,

    /// City label value
    #[arg(long, env = "WEATHER_CITY", default_value = "Astana")]
    city: String,

    /// Country label value
    #[arg(long, env = "WEATHER_COUNTRY", default_value = "Kazakhstan")]
    country: String,

    /// Timezone passed to Open-Meteo
    #[arg(long, env = "WEATHER_TIMEZONE", default_value = "Asia/Almaty")]
    timezone: String,

    /// Repository whose commits are counted (owner/name)
    #[arg(long, env = "GITHUB_REPO", default_value = "prometheus/prometheus")]
    github_repo: String,

    /// Open-Meteo forecast endpoint
    #[arg(long, env = "WEATHER_URL", default_value = "https://api.open-meteo.com/v1/forecast")]
    weather_url: String,

    /// Open-Meteo air quality endpoint
    #[arg(
        long,
        env = "AIR_QUALITY_URL",
        default_value = "https://air-quality-api.open-meteo.com/v1/air-quality"
    )]
    air_quality_url: String,

    /// CoinGecko simple price endpoint
    #[arg(
        long,
        env = "PRICES_URL",
        default_value = "https://api.coingecko.com/api/v3/simple/price"
    )]
    prices_url: String,

    /// Exchange rate endpoint
    #[arg(long, env = "FX_URL", default_value = "https://api.exchangerate.host/latest")]
    fx_url: String,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    github_api_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn to_config(&self) -> ExporterConfig {
        ExporterConfig {
            listen_addr: self.listen_addr.clone(),
            interval: Duration::from_secs(self.interval_seconds),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_seconds),
            sources: SourceConfig {
                latitude: self.latitude,
                longitude: self.longitude,
                city: self.city.clone(),
                country: self.country.clone(),
                timezone: self.timezone.clone(),
                github_repo: self.github_repo.clone(),
                weather_url: self.weather_url.clone(),
                air_quality_url: self.air_quality_url.clone(),
                prices_url: self.prices_url.clone(),
                fx_url: self.fx_url.clone(),
                github_api_url: self.github_api_url.clone(),
            },
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = args.to_config();
    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e);
    }

    info!("Starting External API Exporter v{}", VERSION);
    info!("  Listen address: {}", config.listen_addr);
    info!("  Interval: {:?}", config.interval);
    info!("  Fetch timeout: {:?}", config.fetch_timeout);
    info!(
        "  Location: {}, {} ({}, {})",
        config.sources.city,
        config.sources.country,
        config.sources.latitude,
        config.sources.longitude
    );

    let registry = Arc::new(build_registry(&config.sources)?);
    let orchestrator = Arc::new(build_orchestrator(&config, Arc::clone(&registry))?);

    // Bind before collecting so a port conflict fails fast
    let server = MetricsServer::bind(config.socket_addr()?).await.map_err(|e| {
        error!("{}", e);
        e
    })?;

    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let server_task = tokio::spawn(server.serve(Arc::clone(&registry), shutdown.clone()));

    // Run the collection loop until shutdown
    let scheduler = Scheduler::new(orchestrator, config.interval);
    scheduler.run(shutdown.clone()).await;

    match server_task.await {
        Ok(result) => result?,
        Err(e) => return Err(Error::Internal(format!("Server task failed: {}", e))),
    }

    info!("Exporter shutdown complete");
    Ok(())
}

// =============================================================================
// Signals
// =============================================================================

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "hyper_util=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
