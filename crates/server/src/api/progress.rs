//! Server-Sent Events stream of a session's progress.
//!
//! Each progress event becomes one `data:` message in its wire form. The
//! stream ends after `DONE`, after an `Error:` message, or when the job's
//! channel closes. A client that disconnects only drops its own stream; the
//! job keeps running and the session stays attachable until it finishes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use tubecast_core::{ProgressEvent, SessionChannel};

use super::handlers::{api_error, ApiError};
use crate::metrics::{PROGRESS_EVENTS_SENT, PROGRESS_STREAMS_ACTIVE, PROGRESS_STREAMS_TOTAL};
use crate::state::AppState;

/// Message returned for ids that are unknown or already finished.
pub const INVALID_SESSION_MESSAGE: &str = "Invalid session ID or conversion already completed";

/// Open-stream bookkeeping; logs and updates gauges when the stream is dropped.
struct StreamGuard {
    session_id: String,
}

impl StreamGuard {
    fn new(session_id: String) -> Self {
        PROGRESS_STREAMS_ACTIVE.inc();
        PROGRESS_STREAMS_TOTAL.inc();
        debug!(session_id = %session_id, "Progress stream opened");
        Self { session_id }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        PROGRESS_STREAMS_ACTIVE.dec();
        debug!(session_id = %self.session_id, "Progress stream closed");
    }
}

struct StreamState {
    channel: Arc<SessionChannel>,
    finished: bool,
    _guard: StreamGuard,
}

fn event_kind(event: &ProgressEvent) -> &'static str {
    match event {
        ProgressEvent::Info(_) => "info",
        ProgressEvent::Error(_) => "error",
        ProgressEvent::Complete => "complete",
    }
}

/// Turns a session channel into a stream of SSE events.
fn progress_stream(
    session_id: String,
    channel: Arc<SessionChannel>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let state = StreamState {
        channel,
        finished: false,
        _guard: StreamGuard::new(session_id),
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        let event = state.channel.recv().await?;
        state.finished = event.is_terminal();
        PROGRESS_EVENTS_SENT
            .with_label_values(&[event_kind(&event)])
            .inc();
        Some((Ok(Event::default().data(event.to_wire())), state))
    })
}

/// Attach to a live session's progress.
pub async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let channel = state.launcher().stream(&id).map_err(|e| {
        debug!("{}", e);
        api_error(StatusCode::NOT_FOUND, INVALID_SESSION_MESSAGE)
    })?;

    Ok(Sse::new(progress_stream(id, channel)).keep_alive(KeepAlive::default()))
}
