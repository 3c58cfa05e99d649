//! Domain Layer
//!
//! The port every metric source implements and the value objects that
//! describe fetch and tick outcomes.
//!
//! # Usage
//!
//! ```ignore
//! use external_api_exporter::domain::{Fetcher, FetchOutcome};
//!
//! async fn fetch_once<F: Fetcher>(fetcher: &F, registry: &Registry) -> FetchOutcome {
//!     match fetcher.fetch(registry).await {
//!         Ok(()) => FetchOutcome::Ok,
//!         Err(e) => FetchOutcome::failed(&e),
//!     }
//! }
//! ```

pub mod ports;

pub use ports::{FetchOutcome, Fetcher, SourceReport, TickReport};
