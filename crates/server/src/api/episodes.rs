//! Episode API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use episodic_core::{EpisodeFilter, EpisodeRecord, EpisodeStatus, EpisodeStore};

use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Query parameters for listing episodes
#[derive(Debug, Deserialize)]
pub struct ListEpisodesParams {
    /// Filter by show key
    pub show: Option<String>,
    /// Filter by status (`incomplete`, `seeding`, `complete`)
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for listing episodes
#[derive(Debug, Serialize)]
pub struct ListEpisodesResponse {
    pub episodes: Vec<EpisodeRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct EpisodeErrorResponse {
    pub error: String,
}

pub type EpisodeError = (StatusCode, Json<EpisodeErrorResponse>);

fn error(status: StatusCode, message: impl ToString) -> EpisodeError {
    (
        status,
        Json(EpisodeErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// List tracked episodes with optional filters
pub async fn list_episodes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEpisodesParams>,
) -> Result<Json<ListEpisodesResponse>, EpisodeError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = EpisodeFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref show) = params.show {
        filter = filter.with_show(show);
    }

    if let Some(ref status) = params.status {
        let status: EpisodeStatus = status
            .parse()
            .map_err(|e: String| error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_status(status);
    }

    let episodes = state
        .store()
        .list(&filter)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    // Total count (without pagination)
    let count_filter = EpisodeFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = state
        .store()
        .count(&count_filter)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(ListEpisodesResponse {
        episodes,
        total,
        limit,
        offset,
    }))
}

/// Get one episode by ID
pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EpisodeRecord>, EpisodeError> {
    match state.store().get(&id) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            format!("Episode not found: {}", id),
        )),
        Err(e) => Err(error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}
