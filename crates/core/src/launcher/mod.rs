//! Job submission: validate, register a session, start the pipeline.

mod validate;

pub use validate::{is_supported_source_url, validate_source_url, ValidationError};

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics::{JOBS_REJECTED, JOBS_SUBMITTED};
use crate::pipeline::{ConversionJob, ConversionPipeline};
use crate::session::{SessionChannel, SessionError, SessionId, SessionRegistry};

/// Per-submission options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SubmitOptions {
    /// Apply loudness normalization after the MP3 encode.
    #[serde(default)]
    pub normalize: bool,
}

/// Accepts submissions and runs each as a detached task.
pub struct JobLauncher {
    registry: Arc<SessionRegistry>,
    pipeline: Arc<ConversionPipeline>,
}

impl JobLauncher {
    pub fn new(registry: Arc<SessionRegistry>, pipeline: Arc<ConversionPipeline>) -> Self {
        Self { registry, pipeline }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Validates `url`, registers a session and spawns its job.
    ///
    /// Returns as soon as the task is spawned. Nothing is registered when
    /// validation fails.
    pub fn submit(&self, url: &str, options: SubmitOptions) -> Result<SessionId, ValidationError> {
        let url = match validate_source_url(url) {
            Ok(url) => url,
            Err(e) => {
                JOBS_REJECTED.inc();
                warn!("Rejected submission: {}", e);
                return Err(e);
            }
        };

        let (id, sink) = self.registry.create();
        let job = ConversionJob::new(url, options.normalize);
        info!(session_id = %id, url = %job.url, normalize = job.normalize, "Job accepted");
        JOBS_SUBMITTED.inc();

        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            // Outcome is reported on the session and in metrics.
            let _ = pipeline.execute(job, sink).await;
        });

        Ok(id)
    }

    /// Looks up the progress channel of a live session.
    pub fn stream(&self, id: &str) -> Result<Arc<SessionChannel>, SessionError> {
        self.registry.get(id)
    }
}
