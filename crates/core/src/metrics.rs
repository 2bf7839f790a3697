//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discovery (submissions, skipped feed items)
//! - Lifecycle monitoring (placements, completions, cleanups)
//! - Orchestrator passes (runs, durations, errors)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Discovery Metrics
// =============================================================================

/// Episodes submitted to the torrent client.
pub static EPISODES_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "episodic_episodes_submitted_total",
            "Total episodes submitted to the torrent client",
        ),
        &["result"], // "added", "duplicate_resumed"
    )
    .unwrap()
});

/// Feed items skipped by reason.
pub static ITEMS_SKIPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("episodic_items_skipped_total", "Total feed items skipped"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Lifecycle Metrics
// =============================================================================

/// Episode files placed at their destination.
pub static EPISODES_PLACED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "episodic_episodes_placed_total",
            "Total episode files placed at their destination",
        ),
        &["mode"], // "move", "copy"
    )
    .unwrap()
});

/// Transfers that reached their seed target.
pub static TRANSFERS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "episodic_transfers_completed_total",
        "Total transfers that reached their seed target",
    )
    .unwrap()
});

/// Transfers whose artifacts were cleaned up.
pub static TRANSFERS_CLEANED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "episodic_transfers_cleaned_total",
        "Total transfers cleaned up",
    )
    .unwrap()
});

/// Cleanup attempts that failed and were rescheduled.
pub static CLEANUP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "episodic_cleanup_failures_total",
        "Total failed cleanup attempts",
    )
    .unwrap()
});

/// Transfers that disappeared from the torrent client.
pub static TRANSFERS_VANISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "episodic_transfers_vanished_total",
        "Total transfers removed outside of episodic",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Pass Metrics
// =============================================================================

/// Pass runs by pass and result.
pub static PASS_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("episodic_pass_runs_total", "Total orchestrator passes"),
        &["pass", "result"], // pass: "discovery", "monitor"; result: "ok", "partial", "aborted"
    )
    .unwrap()
});

/// Pass duration in seconds.
pub static PASS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("episodic_pass_duration_seconds", "Duration of orchestrator passes")
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["pass"],
    )
    .unwrap()
});

/// Errors raised during passes by kind.
pub static PASS_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("episodic_pass_errors_total", "Total errors raised during passes"),
        &["pass", "kind"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Discovery
        Box::new(EPISODES_SUBMITTED.clone()),
        Box::new(ITEMS_SKIPPED.clone()),
        // Lifecycle
        Box::new(EPISODES_PLACED.clone()),
        Box::new(TRANSFERS_COMPLETED.clone()),
        Box::new(TRANSFERS_CLEANED.clone()),
        Box::new(CLEANUP_FAILURES.clone()),
        Box::new(TRANSFERS_VANISHED.clone()),
        // Passes
        Box::new(PASS_RUNS.clone()),
        Box::new(PASS_DURATION.clone()),
        Box::new(PASS_ERRORS.clone()),
    ]
}
