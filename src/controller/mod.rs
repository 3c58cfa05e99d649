//! Controller module
//!
//! Implements the collection loop: the orchestrator runs one tick over every
//! source, and the scheduler repeats ticks on a fixed interval until shutdown.

mod orchestrator;
mod scheduler;

pub use orchestrator::Orchestrator;
pub use scheduler::{next_delay, Scheduler, SchedulerState};
