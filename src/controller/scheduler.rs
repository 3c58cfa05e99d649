//! Periodic Scheduler
//!
//! Drives the orchestrator on a fixed interval until shutdown. Ticks never
//! overlap: when a tick runs longer than the interval the next one starts as
//! soon as it finishes, and missed ticks are not replayed.
//!
//! ```text
//!   ┌──────┐  interval elapsed  ┌────────────┐
//!   │ Idle │ ─────────────────▶ │ Collecting │
//!   └──────┘ ◀───────────────── └────────────┘
//!      │        tick complete          │
//!      │ shutdown                      │ shutdown (after tick completes)
//!      ▼                               ▼
//!   ┌─────────────────────────────────────┐
//!   │               Stopped               │
//!   └─────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::orchestrator::Orchestrator;

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// A tick is in flight
    Collecting,
    /// Shutdown observed; no further ticks
    Stopped,
}

/// Delay before the next tick, given how long the last one took
pub fn next_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Runs ticks back to back on a fixed interval
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
    state: RwLock<SchedulerState>,
    ticks: AtomicU64,
}

impl Scheduler {
    /// Create an idle scheduler that ticks `orchestrator` every `interval`
    pub fn new(orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            state: RwLock::new(SchedulerState::Idle),
            ticks: AtomicU64::new(0),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Number of completed ticks
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Configured time between tick starts
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// The first tick fires immediately. A tick already in flight when
    /// shutdown is requested runs to completion before this returns.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Scheduler started: interval {:?}, {} sources",
            self.interval,
            self.orchestrator.fetcher_count()
        );

        while !shutdown.is_cancelled() {
            *self.state.write() = SchedulerState::Collecting;
            let start = Instant::now();
            self.orchestrator.run_tick().await;
            let elapsed = start.elapsed();
            *self.state.write() = SchedulerState::Idle;
            let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

            let delay = next_delay(self.interval, elapsed);
            if delay.is_zero() {
                warn!(
                    "Tick {} took {:?}, longer than the {:?} interval; starting next tick now",
                    n, elapsed, self.interval
                );
            } else {
                debug!("Tick {} done, next in {:?}", n, delay);
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        *self.state.write() = SchedulerState::Stopped;
        info!("Scheduler stopped after {} ticks", self.ticks());
    }
}

// =============================================================================
// Tests
// =============================================================================
