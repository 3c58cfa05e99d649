//! Metrics module
//!
//! The registry that holds every exposed series, the catalog of declared
//! families, and the text exposition renderer.

pub mod catalog;
pub mod exposition;
mod registry;

pub use exposition::{families, render};
pub use registry::{
    FamilySnapshot, MetricDesc, MetricKind, Registry, RegistryResult, Snapshot,
};
