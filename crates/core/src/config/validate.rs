use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Output directory is set
/// - Download size ceiling and title length are positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.storage.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.output_dir cannot be empty".to_string(),
        ));
    }

    if config.pipeline.max_download_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_download_bytes must be greater than 0".to_string(),
        ));
    }

    if config.pipeline.title_max_chars == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.title_max_chars must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
