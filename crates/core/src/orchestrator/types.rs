//! Types for the acquisition orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitor::MonitorReport;
use crate::planner::DiscoveryReport;

/// Episode counts by lifecycle status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeCounts {
    pub incomplete: usize,
    pub seeding: usize,
    pub complete: usize,
    /// Complete records whose transfer has not been fully removed yet.
    pub pending_cleanup: usize,
}

/// Summary of the most recent pass of one kind.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl From<&DiscoveryReport> for PassSummary {
    fn from(report: &DiscoveryReport) -> Self {
        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            errors: report.error_count(),
            aborted: report.aborted.clone(),
        }
    }
}

impl From<&MonitorReport> for PassSummary {
    fn from(report: &MonitorReport) -> Self {
        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            errors: report.errors.len(),
            aborted: report.aborted.clone(),
        }
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorStatus {
    /// Whether the background loop is running.
    pub running: bool,
    pub monitor_interval_secs: u64,
    pub discovery_interval_secs: u64,
    pub last_discovery: Option<PassSummary>,
    pub last_monitor: Option<PassSummary>,
    pub episodes: EpisodeCounts,
    /// Configured shows that failed validation.
    pub invalid_shows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RecordFailure;

    #[test]
    fn test_summary_from_monitor_report() {
        let mut report = MonitorReport::new(Utc::now());
        report.errors.push(RecordFailure {
            id: "1".into(),
            show: "dexter".into(),
            season: 5,
            episode: 2,
            error: "filesystem error".into(),
        });
        report.aborted = Some("torrent client unavailable".into());

        let summary = PassSummary::from(&report);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.aborted.as_deref(), Some("torrent client unavailable"));
    }

    #[test]
    fn test_status_serialization_omits_abort() {
        let status = OrchestratorStatus {
            running: true,
            last_monitor: Some(PassSummary::from(&MonitorReport::new(Utc::now()))),
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["running"], true);
        assert!(json["last_monitor"].get("aborted").is_none());
        assert!(json["last_discovery"].is_null());
    }
}
