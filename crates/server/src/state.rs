use std::sync::Arc;
use tubecast_core::{
    AudioTranscoder, Config, ConversionPipeline, EpisodeLibrary, JobLauncher, MediaFetcher,
    PipelineSettings, SanitizedConfig, SessionRegistry,
};

/// Shared application state
pub struct AppState {
    config: Config,
    launcher: JobLauncher,
    episodes: EpisodeLibrary,
}

impl AppState {
    /// Wires the registry, pipeline, launcher and episode library around the given tools.
    pub fn new(
        config: Config,
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let pipeline = Arc::new(ConversionPipeline::new(
            PipelineSettings::from(&config),
            fetcher,
            Arc::clone(&transcoder),
        ));
        let launcher = JobLauncher::new(registry, pipeline);
        let episodes = EpisodeLibrary::new(config.storage.output_dir.clone(), transcoder);

        Self {
            config,
            launcher,
            episodes,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn launcher(&self) -> &JobLauncher {
        &self.launcher
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.launcher.registry()
    }

    pub fn episodes(&self) -> &EpisodeLibrary {
        &self.episodes
    }
}
