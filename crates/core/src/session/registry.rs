//! Session registry: session id → progress channel.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::event::ProgressEvent;
use crate::metrics::SESSIONS_ACTIVE;

/// Error text sent when a sink goes away before its job reported an outcome.
pub const ABORTED_MESSAGE: &str = "Conversion aborted unexpectedly";

/// Errors returned by registry lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The id was never issued, or its job already finished.
    #[error("Invalid session ID or conversion already completed: {id}")]
    NotFound { id: String },
}

/// Opaque identifier of one conversion session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Read side of a session's progress queue.
///
/// Several readers may hold the same channel; they take turns, so each event
/// is delivered to exactly one of them.
#[derive(Debug)]
pub struct SessionChannel {
    id: SessionId,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<ProgressEvent>>,
}

impl SessionChannel {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Waits for the next event. `None` once the producer is gone and the queue is drained.
    pub async fn recv(&self) -> Option<ProgressEvent> {
        self.receiver.lock().await.recv().await
    }
}

/// Concurrency-safe map of live sessions.
///
/// A single mutex linearizes `create`, `get` and `remove`; it is never held
/// across an await point.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<SessionChannel>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<SessionChannel>>> {
        // The map holds no invariants a panicking holder could break halfway.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a fresh session and returns its id plus the write side.
    ///
    /// Dropping the returned [`ProgressSink`] removes the session and closes
    /// its channel.
    pub fn create(self: &Arc<Self>) -> (SessionId, ProgressSink) {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut sessions = self.lock();
            let mut id = SessionId::generate();
            while sessions.contains_key(&id) {
                id = SessionId::generate();
            }
            sessions.insert(
                id.clone(),
                Arc::new(SessionChannel {
                    id: id.clone(),
                    receiver: tokio::sync::Mutex::new(rx),
                }),
            );
            id
        };

        SESSIONS_ACTIVE.inc();
        debug!(session_id = %id, "Session created");

        let sink = ProgressSink {
            id: id.clone(),
            registry: Arc::clone(self),
            tx,
            finished: AtomicBool::new(false),
        };
        (id, sink)
    }

    /// Looks up the channel of a live session.
    pub fn get(&self, id: &str) -> Result<Arc<SessionChannel>, SessionError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })
    }

    /// Removes a session. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            SESSIONS_ACTIVE.dec();
            debug!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Whether a session is currently registered.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write side of a session, owned by the pipeline task.
///
/// Nothing is delivered after a terminal event. Dropping a sink that never
/// sent one (a panicking or cancelled job) emits [`ABORTED_MESSAGE`] as an
/// error. On drop the session is removed from the registry first, then the
/// channel closes, so a reader that sees the end of the stream can never find
/// the id again.
#[derive(Debug)]
pub struct ProgressSink {
    id: SessionId,
    registry: Arc<SessionRegistry>,
    tx: mpsc::UnboundedSender<ProgressEvent>,
    finished: AtomicBool,
}

impl ProgressSink {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Queues an event for the session's readers.
    pub fn send(&self, event: ProgressEvent) {
        if self.finished.load(Ordering::Acquire) {
            debug!(session_id = %self.id, "Dropping event after terminal: {}", event);
            return;
        }
        if event.is_terminal() {
            self.finished.store(true, Ordering::Release);
        }
        // No reader is fine; the job keeps running regardless.
        let _ = self.tx.send(event);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.send(ProgressEvent::info(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.send(ProgressEvent::error(text));
    }

    pub fn complete(&self) {
        self.send(ProgressEvent::Complete);
    }

    /// Whether a terminal event has been sent.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Drop for ProgressSink {
    fn drop(&mut self) {
        if !self.is_finished() {
            // Only reachable when the job task unwound or was cancelled.
            warn!(session_id = %self.id, "Job ended without a terminal event");
            self.send(ProgressEvent::error(ABORTED_MESSAGE));
        }
        self.registry.remove(self.id.as_str());
        // `tx` is dropped after this body, closing the channel.
    }
}
