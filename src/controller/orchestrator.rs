//! Collection Orchestrator
//!
//! Runs every fetcher once per tick, concurrently and in isolation. Each
//! fetch runs in its own task and is aborted once its timeout elapses, so a
//! slow source never holds the tick past that bound and a panicking one is
//! contained. Every failure becomes a failed outcome
//! and the overall health gauge is written after every tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{FetchOutcome, Fetcher, SourceReport, TickReport};
use crate::error::FetchError;
use crate::metrics::catalog::{
    self, EXPORTER_UP, FETCH_FAILURES_TOTAL, LAST_TICK_DURATION, SOURCE_UP, TICKS_TOTAL,
};
use crate::metrics::{Registry, RegistryResult};

/// Runs one collection tick over a fixed set of fetchers
pub struct Orchestrator {
    registry: Arc<Registry>,
    fetchers: Vec<Arc<dyn Fetcher>>,
    default_timeout: Duration,
}

impl Orchestrator {
    /// Create an orchestrator.
    ///
    /// `default_timeout` bounds fetchers that declare no timeout of their own.
    /// Every fetcher's `source_up` and `fetch_failures_total` series start at 0.
    pub fn new(
        registry: Arc<Registry>,
        fetchers: Vec<Arc<dyn Fetcher>>,
        default_timeout: Duration,
    ) -> Self {
        let orchestrator = Self {
            registry,
            fetchers,
            default_timeout,
        };
        orchestrator.record(catalog::seed_sources(
            &orchestrator.registry,
            orchestrator.fetchers.iter().map(|f| f.name()),
        ));
        orchestrator
    }

    /// Shared registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Number of fetchers
    pub fn fetcher_count(&self) -> usize {
        self.fetchers.len()
    }

    /// Invoke every fetcher exactly once and record health.
    #[instrument(skip(self))]
    pub async fn run_tick(&self) -> TickReport {
        let started_at = Utc::now();
        let start = Instant::now();

        let sources = join_all(self.fetchers.iter().map(|f| self.run_fetcher(f))).await;

        let report = TickReport {
            started_at,
            sources,
            duration: start.elapsed(),
        };
        let overall_ok = report.overall_ok();

        self.record(self.registry.set(EXPORTER_UP, &[], if overall_ok { 1.0 } else { 0.0 }));
        self.record(self.registry.increment(TICKS_TOTAL, &[], 1.0));
        self.record(
            self.registry
                .set(LAST_TICK_DURATION, &[], report.duration.as_secs_f64()),
        );

        info!(
            "Tick complete in {:?}: {} sources, {} failed, up={}",
            report.duration,
            report.sources.len(),
            report.failed_count(),
            overall_ok
        );
        report
    }

    async fn run_fetcher(&self, fetcher: &Arc<dyn Fetcher>) -> SourceReport {
        let name = fetcher.name();
        let deadline = fetcher.timeout().unwrap_or(self.default_timeout);
        let start = Instant::now();

        let result = {
            let fetcher = Arc::clone(fetcher);
            let registry = Arc::clone(&self.registry);
            let handle = tokio::spawn(async move { fetcher.fetch(&registry).await });
            let abort = handle.abort_handle();

            match tokio::time::timeout(deadline, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) if join_error.is_panic() => {
                    Err(FetchError::Panicked(panic_message(join_error.into_panic())))
                }
                Ok(Err(join_error)) => Err(FetchError::Panicked(join_error.to_string())),
                Err(_) => {
                    abort.abort();
                    Err(FetchError::Timeout(deadline))
                }
            }
        };

        let outcome = match result {
            Ok(()) => {
                debug!("Source {} ok", name);
                FetchOutcome::Ok
            }
            Err(e) => {
                match &e {
                    FetchError::Panicked(_) | FetchError::Registry(_) => {
                        error!("Source {} failed ({}): {}", name, e.kind(), e)
                    }
                    _ => warn!("Source {} failed ({}): {}", name, e.kind(), e),
                }
                self.record(fetcher.on_failure(&self.registry));
                self.record(self.registry.increment(FETCH_FAILURES_TOTAL, &[name], 1.0));
                FetchOutcome::failed(&e)
            }
        };

        let up = if outcome.is_ok() { 1.0 } else { 0.0 };
        self.record(self.registry.set(SOURCE_UP, &[name], up));

        SourceReport {
            source: name,
            affects_health: fetcher.affects_health(),
            outcome,
            duration: start.elapsed(),
        }
    }

    fn record(&self, result: RegistryResult<()>) {
        if let Err(e) = result {
            error!("Registry write failed: {}", e);
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
