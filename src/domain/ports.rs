//! Domain Ports
//!
//! The abstraction every metric source implements, and the value objects
//! that describe the outcome of a fetch and of a whole tick.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │             Fetcher │ FetchOutcome │ TickReport     │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │  Weather │ Prices │ ExchangeRates │ Activity │ ...   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::metrics::{Registry, RegistryResult};

// =============================================================================
// Fetcher Port
// =============================================================================

/// One metric source.
///
/// `fetch` performs at most a bounded amount of network work and writes its
/// results into the registry. On failure it leaves the values it owns
/// untouched; the orchestrator then applies [`Fetcher::on_failure`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Stable source name, used as the `source` label and in logs
    fn name(&self) -> &'static str;

    /// Deadline for one fetch. `None` means the fetcher does no I/O.
    fn timeout(&self) -> Option<Duration>;

    /// Whether this source's outcome feeds the overall health gauge
    fn affects_health(&self) -> bool {
        true
    }

    /// Fetch once and write into the registry
    async fn fetch(&self, registry: &Registry) -> Result<(), FetchError>;

    /// Failure policy, applied after any failed outcome (including timeout
    /// and panic)
    fn on_failure(&self, _registry: &Registry) -> RegistryResult<()> {
        Ok(())
    }
}

// =============================================================================
// Value Objects
// =============================================================================

/// Result of one fetcher invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// All required writes applied
    Ok,
    /// The fetch failed; prior values are retained (or replaced by the
    /// fetcher's failure policy)
    Failed {
        /// Failure kind, e.g. `timeout` or `missing_field`
        kind: &'static str,
        /// Human readable reason
        reason: String,
    },
}

impl FetchOutcome {
    /// Build a failed outcome from an error
    pub fn failed(error: &FetchError) -> Self {
        FetchOutcome::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    /// Whether the fetch succeeded
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchOutcome::Ok)
    }
}

impl std::fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOutcome::Ok => write!(f, "ok"),
            FetchOutcome::Failed { kind, reason } => write!(f, "failed ({}): {}", kind, reason),
        }
    }
}

/// Outcome of one source within a tick
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// Source name
    pub source: &'static str,
    /// Whether the outcome feeds overall health
    pub affects_health: bool,
    /// Outcome
    pub outcome: FetchOutcome,
    /// Time spent in the fetch
    pub duration: Duration,
}

/// Summary of one collection tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// When the tick started
    pub started_at: DateTime<Utc>,
    /// Per-source outcomes, in fetcher order
    pub sources: Vec<SourceReport>,
    /// Wall time of the whole tick
    pub duration: Duration,
}

impl TickReport {
    /// AND of every health-relevant outcome
    pub fn overall_ok(&self) -> bool {
        self.sources
            .iter()
            .filter(|s| s.affects_health)
            .all(|s| s.outcome.is_ok())
    }

    /// Outcome for a named source
    pub fn outcome(&self, source: &str) -> Option<&FetchOutcome> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .map(|s| &s.outcome)
    }

    /// Number of failed sources
    pub fn failed_count(&self) -> usize {
        self.sources.iter().filter(|s| !s.outcome.is_ok()).count()
    }
}
