//! Orchestrator API handlers.
//!
//! The pass endpoints run one pass synchronously and return its report.
//! A pass already in flight (background or on demand) is waited for first.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use episodic_core::{DiscoveryReport, MonitorReport, OrchestratorStatus};

use crate::state::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct OrchestratorErrorResponse {
    pub error: String,
}

pub type OrchestratorError = (StatusCode, Json<OrchestratorErrorResponse>);

/// Get orchestrator status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OrchestratorStatus>, OrchestratorError> {
    state.orchestrator().status().await.map(Json).map_err(|e| {
        error!(error = %e, "Failed to read orchestrator status");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OrchestratorErrorResponse {
                error: e.to_string(),
            }),
        )
    })
}

/// Run one discovery pass now
pub async fn discover(State(state): State<Arc<AppState>>) -> Json<DiscoveryReport> {
    info!("Discovery pass requested via API");
    Json(state.orchestrator().run_discovery_pass().await)
}

/// Run one monitor pass now
pub async fn monitor(State(state): State<Arc<AppState>>) -> Json<MonitorReport> {
    info!("Monitor pass requested via API");
    Json(state.orchestrator().run_monitor_pass().await)
}
