//! Acquisition orchestrator implementation.
//!
//! One background task owns two independent timers. The monitor interval
//! advances tracked transfers; the discovery interval looks for new episodes.
//! A pass always runs to completion, so shutdown is observed between passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::monitor::{self, MonitorReport};
use crate::planner::{self, DiscoveryReport};
use crate::store::{EpisodeFilter, EpisodeStatus, StoreError};

use super::config::OrchestratorConfig;
use super::context::AcquisitionContext;
use super::types::{EpisodeCounts, OrchestratorStatus, PassSummary};

/// Drives discovery and monitor passes on their intervals.
pub struct AcquisitionOrchestrator {
    config: OrchestratorConfig,
    ctx: Arc<AcquisitionContext>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    /// Serializes passes between the loop and on-demand API calls.
    pass_lock: Arc<Mutex<()>>,
    last_discovery: Arc<RwLock<Option<PassSummary>>>,
    last_monitor: Arc<RwLock<Option<PassSummary>>>,
}

impl AcquisitionOrchestrator {
    /// Create a new orchestrator.
    pub fn new(config: OrchestratorConfig, ctx: Arc<AcquisitionContext>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            ctx,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            pass_lock: Arc::new(Mutex::new(())),
            last_discovery: Arc::new(RwLock::new(None)),
            last_monitor: Arc::new(RwLock::new(None)),
        }
    }

    pub fn context(&self) -> &Arc<AcquisitionContext> {
        &self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the orchestrator (spawns the background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!(
            monitor_interval_secs = self.config.monitor_interval_secs,
            discovery_interval_secs = self.config.discovery_interval_secs,
            "Starting acquisition orchestrator"
        );
        self.spawn_loop();
    }

    /// Stop the orchestrator gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping acquisition orchestrator");
        let _ = self.shutdown_tx.send(());

        // Wait for a pass in flight to finish.
        let _guard = self.pass_lock.lock().await;
        info!("Acquisition orchestrator stopped");
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> Result<OrchestratorStatus, StoreError> {
        let store = &self.ctx.store;
        let count = |status: EpisodeStatus| -> Result<usize, StoreError> {
            Ok(store.count(&EpisodeFilter::new().with_status(status))? as usize)
        };

        let pending_cleanup = store
            .list(
                &EpisodeFilter::new()
                    .with_status(EpisodeStatus::Complete)
                    .with_limit(i64::MAX),
            )?
            .iter()
            .filter(|r| r.cleanup_pending)
            .count();

        Ok(OrchestratorStatus {
            running: self.is_running(),
            monitor_interval_secs: self.config.monitor_interval_secs,
            discovery_interval_secs: self.config.discovery_interval_secs,
            last_discovery: self.last_discovery.read().await.clone(),
            last_monitor: self.last_monitor.read().await.clone(),
            episodes: EpisodeCounts {
                incomplete: count(EpisodeStatus::Incomplete)?,
                seeding: count(EpisodeStatus::Seeding)?,
                complete: count(EpisodeStatus::Complete)?,
                pending_cleanup,
            },
            invalid_shows: self.ctx.shows.invalid().count(),
        })
    }

    /// Run one discovery pass now.
    pub async fn run_discovery_pass(&self) -> DiscoveryReport {
        Self::discovery(&self.ctx, &self.pass_lock, &self.last_discovery).await
    }

    /// Run one monitor pass now.
    pub async fn run_monitor_pass(&self) -> MonitorReport {
        Self::monitor(&self.ctx, &self.pass_lock, &self.last_monitor).await
    }

    async fn discovery(
        ctx: &AcquisitionContext,
        pass_lock: &Mutex<()>,
        last: &RwLock<Option<PassSummary>>,
    ) -> DiscoveryReport {
        let _guard = pass_lock.lock().await;
        let started = Instant::now();
        let report = planner::run_discovery_pass(ctx).await;
        record_pass("discovery", started, report.aborted.is_some(), report.error_count());
        *last.write().await = Some(PassSummary::from(&report));
        report
    }

    async fn monitor(
        ctx: &AcquisitionContext,
        pass_lock: &Mutex<()>,
        last: &RwLock<Option<PassSummary>>,
    ) -> MonitorReport {
        let _guard = pass_lock.lock().await;
        let started = Instant::now();
        let report = monitor::run_monitor_pass(ctx).await;
        record_pass("monitor", started, report.aborted.is_some(), report.errors.len());
        *last.write().await = Some(PassSummary::from(&report));
        report
    }

    /// Spawn the orchestration loop task.
    fn spawn_loop(&self) {
        let running = Arc::clone(&self.running);
        let ctx = Arc::clone(&self.ctx);
        let pass_lock = Arc::clone(&self.pass_lock);
        let last_discovery = Arc::clone(&self.last_discovery);
        let last_monitor = Arc::clone(&self.last_monitor);
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Orchestration loop started");

            // Both intervals fire immediately on the first tick.
            let mut monitor_tick = tokio::time::interval(config.monitor_interval());
            let mut discovery_tick = tokio::time::interval(config.discovery_interval());
            monitor_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            discovery_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Orchestration loop received shutdown signal");
                        break;
                    }
                    _ = monitor_tick.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::monitor(&ctx, &pass_lock, &last_monitor).await;
                    }
                    _ = discovery_tick.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::discovery(&ctx, &pass_lock, &last_discovery).await;
                    }
                }
            }
            info!("Orchestration loop stopped");
        });
    }
}

fn record_pass(pass: &str, started: Instant, aborted: bool, errors: usize) {
    let elapsed: Duration = started.elapsed();
    let result = if aborted {
        "aborted"
    } else if errors > 0 {
        "partial"
    } else {
        "ok"
    };
    metrics::PASS_RUNS.with_label_values(&[pass, result]).inc();
    metrics::PASS_DURATION
        .with_label_values(&[pass])
        .observe(elapsed.as_secs_f64());
    debug!(pass, result, elapsed_ms = elapsed.as_millis() as u64, "Pass recorded");
}
