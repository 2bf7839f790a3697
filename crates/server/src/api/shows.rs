//! Show API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use episodic_core::{EpisodeFilter, EpisodeStore, ShowConfig};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// One configured show, valid or not.
#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub key: String,
    pub valid: bool,
    /// Why the show's configuration was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<ShowConfig>,
    /// Episodes currently tracked for this show.
    pub tracked: i64,
}

#[derive(Debug, Serialize)]
pub struct ListShowsResponse {
    pub shows: Vec<ShowResponse>,
}

#[derive(Debug, Serialize)]
pub struct ResetHistoryResponse {
    pub show: String,
    pub deleted: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ShowErrorResponse {
    pub error: String,
}

pub type ShowError = (StatusCode, Json<ShowErrorResponse>);

fn internal(e: impl ToString) -> ShowError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ShowErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// List configured shows, including the ones that failed validation
pub async fn list_shows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListShowsResponse>, ShowError> {
    let tracked = |key: &str| {
        let filter = EpisodeFilter::new().with_show(key).with_limit(i64::MAX);
        state.store().count(&filter)
    };

    let mut shows = Vec::with_capacity(state.shows().len());
    for show in state.shows().shows() {
        shows.push(ShowResponse {
            key: show.key.clone(),
            valid: true,
            error: None,
            settings: Some(show.clone()),
            tracked: tracked(&show.key).map_err(internal)?,
        });
    }
    for invalid in state.shows().invalid() {
        shows.push(ShowResponse {
            key: invalid.key.clone(),
            valid: false,
            error: Some(invalid.reason.clone()),
            settings: None,
            tracked: tracked(&invalid.key).map_err(internal)?,
        });
    }
    shows.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(Json(ListShowsResponse { shows }))
}

/// Delete every tracked episode of one show
pub async fn reset_history(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<ResetHistoryResponse>, ShowError> {
    if !state.shows().contains(&key) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ShowErrorResponse {
                error: format!("Show not configured: {}", key),
            }),
        ));
    }

    // Wait out any discovery pass working on this show.
    let _guard = state.orchestrator().context().lock_show(&key).await;
    let deleted = state.store().delete_show(&key).map_err(internal)?;
    info!(show = %key, deleted, "Show history reset");

    Ok(Json(ResetHistoryResponse { show: key, deleted }))
}
