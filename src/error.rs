//! Error types for the External API Exporter
//!
//! Three layers of failure are kept apart:
//!
//! - [`RegistryError`] - misuse of the metric registry (programmer error)
//! - [`FetchError`] - a single source failed; always downgraded to a failed outcome
//! - [`Error`] - startup and server errors that terminate the process

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that terminate startup or the exposition server
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Registry misuse during wiring
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Misuse of the metric registry.
///
/// These never occur with correct wiring; they surface loudly in logs and tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// A family with this name is already declared
    #[error("Metric already declared: {0}")]
    DuplicateMetric(String),

    /// No family with this name was declared
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Label value count does not match the declared label names
    #[error("Metric {name} expects {expected} label values, got {got}")]
    LabelArity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Counters only move forward
    #[error("Negative delta {delta} for counter {name}")]
    InvalidDelta { name: String, delta: f64 },

    /// Operation does not apply to the family's kind
    #[error("Operation '{operation}' not allowed on {kind} metric {name}")]
    KindMismatch {
        name: String,
        kind: &'static str,
        operation: &'static str,
    },

    /// NaN or infinite value
    #[error("Non-finite value {value} for metric {name}")]
    NonFiniteValue { name: String, value: f64 },

    /// Info families are written once
    #[error("Info metric {0} already set")]
    InfoAlreadySet(String),
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Why a single source fetch failed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure (DNS, connect, reset)
    #[error("Connection error: {0}")]
    Connection(#[source] reqwest::Error),

    /// The call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Non-success HTTP status
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// Body was not valid JSON for the expected schema
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A required field is absent or null
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// JSON had the wrong top-level shape
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Successful response carrying no samples
    #[error("Response contained no samples")]
    Empty,

    /// Value outside its physical range
    #[error("Value {value} out of range for {field}")]
    OutOfRange { field: &'static str, value: f64 },

    /// The fetcher panicked
    #[error("Fetcher panicked: {0}")]
    Panicked(String),

    /// The fetcher misused the registry
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl FetchError {
    /// Short machine-friendly name of the failure kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connection(_) => "connection",
            FetchError::Timeout(_) => "timeout",
            FetchError::Status(_) => "status",
            FetchError::Decode(_) => "decode",
            FetchError::MissingField(_) => "missing_field",
            FetchError::UnexpectedShape(_) => "unexpected_shape",
            FetchError::Empty => "empty",
            FetchError::OutOfRange { .. } => "out_of_range",
            FetchError::Panicked(_) => "panicked",
            FetchError::Registry(_) => "registry",
        }
    }
}
