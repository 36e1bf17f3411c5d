//! Live conversion sessions and their progress channels.
//!
//! A session is created by the launcher when a job is accepted. The pipeline
//! owns the write side ([`ProgressSink`]); streaming handlers look up the read
//! side ([`SessionChannel`]) by id. When the sink is dropped the session is
//! removed and its channel closes, whatever path the job took to get there.

mod event;
mod registry;

pub use event::{ProgressEvent, DONE_SENTINEL, ERROR_PREFIX, INFO_ESCAPE};
pub use registry::{
    ProgressSink, SessionChannel, SessionError, SessionId, SessionRegistry, ABORTED_MESSAGE,
};
