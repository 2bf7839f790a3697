//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the acquisition orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the background loop.
    /// When disabled, passes only run when triggered via the API.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often to poll active transfers (seconds).
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,

    /// How often to look for new episodes (seconds).
    #[serde(default = "default_discovery_interval")]
    pub discovery_interval_secs: u64,

    /// Delay before the first cleanup retry (seconds). Doubles per attempt.
    #[serde(default = "default_cleanup_retry_base")]
    pub cleanup_retry_base_secs: u64,

    /// Upper bound for the cleanup retry delay (seconds).
    #[serde(default = "default_cleanup_retry_max")]
    pub cleanup_retry_max_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_monitor_interval() -> u64 {
    60
}

fn default_discovery_interval() -> u64 {
    3600
}

fn default_cleanup_retry_base() -> u64 {
    60
}

fn default_cleanup_retry_max() -> u64 {
    3600
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            monitor_interval_secs: default_monitor_interval(),
            discovery_interval_secs: default_discovery_interval(),
            cleanup_retry_base_secs: default_cleanup_retry_base(),
            cleanup_retry_max_secs: default_cleanup_retry_max(),
        }
    }
}

impl OrchestratorConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }

    pub fn cleanup_retry(&self) -> RetryPolicy {
        RetryPolicy {
            base: Duration::from_secs(self.cleanup_retry_base_secs),
            max: Duration::from_secs(self.cleanup_retry_max_secs),
        }
    }
}

/// Exponential backoff for failed cleanups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt:
    /// `min(base * 2^(attempt-1), max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        OrchestratorConfig::default().cleanup_retry()
    }
}
