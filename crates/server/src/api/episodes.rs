//! Episode listing, deletion and the RSS feed.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use tubecast_core::{feed, Episode, EpisodeError};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

/// Host used in feed links when the request carries none.
const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Serialize)]
pub struct EpisodeListResponse {
    pub episodes: Vec<Episode>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub file: String,
}

fn episode_error(e: EpisodeError) -> ApiError {
    match e {
        EpisodeError::InvalidName { .. } | EpisodeError::NotMp3 { .. } => {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        EpisodeError::NotFound { .. } => api_error(StatusCode::NOT_FOUND, e.to_string()),
        EpisodeError::Io(_) => {
            error!("Episode operation failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// List published episodes
pub async fn list_episodes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EpisodeListResponse>, ApiError> {
    let episodes = state.episodes().list().await.map_err(episode_error)?;
    Ok(Json(EpisodeListResponse {
        total: episodes.len(),
        episodes,
    }))
}

/// Delete one episode by file name
pub async fn delete_episode(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.episodes().delete(&file).await.map_err(episode_error)?;
    Ok(Json(DeleteResponse {
        message: "File deleted successfully".to_string(),
        file,
    }))
}

/// RSS 2.0 feed over all episodes
pub async fn feed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(DEFAULT_HOST);

    let episodes = state.episodes().list().await.map_err(episode_error)?;
    let xml = feed::render_feed(&state.config().feed, host, &episodes, Local::now());

    Ok(([(header::CONTENT_TYPE, feed::FEED_CONTENT_TYPE)], xml))
}
