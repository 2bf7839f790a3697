//! Acquisition orchestrator.
//!
//! Owns the shared [`AcquisitionContext`] and the timers that run the two
//! passes:
//! - **Monitor**: advances tracked transfers (download, seed, clean up)
//! - **Discovery**: finds and submits missing episodes for each show

mod config;
mod context;
mod runner;
mod types;

pub use config::{OrchestratorConfig, RetryPolicy};
pub use context::AcquisitionContext;
pub use runner::AcquisitionOrchestrator;
pub use types::{EpisodeCounts, OrchestratorStatus, PassSummary};
