//! Job submission handler.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use tubecast_core::SubmitOptions;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

/// Request body for starting a conversion
#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    /// Source URL; missing and empty are reported the same way
    #[serde(default)]
    pub url: Option<String>,
    /// Apply loudness normalization
    #[serde(default)]
    pub normalize: bool,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Start a conversion and return its session id without waiting for it.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConvertBody>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        debug!("Rejected convert body: {}", e);
        api_error(StatusCode::BAD_REQUEST, e.body_text())
    })?;

    let options = SubmitOptions {
        normalize: body.normalize,
    };
    let id = state
        .launcher()
        .submit(body.url.as_deref().unwrap_or_default(), options)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(ConvertResponse {
        session_id: id.into(),
    }))
}
