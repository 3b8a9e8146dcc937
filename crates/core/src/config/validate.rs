use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Tool paths are not empty
/// - Chunk size and every streaming timeout are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.tools.downloader_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.downloader_path cannot be empty".to_string(),
        ));
    }

    if config.tools.muxer_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.muxer_path cannot be empty".to_string(),
        ));
    }

    if config.tools.metadata_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tools.metadata_timeout_secs cannot be 0".to_string(),
        ));
    }

    let streaming = &config.streaming;
    if streaming.chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "streaming.chunk_size cannot be 0".to_string(),
        ));
    }

    let timeouts = [
        ("streaming.muxer_stop_timeout_secs", streaming.muxer_stop_timeout_secs),
        ("streaming.muxer_exit_timeout_secs", streaming.muxer_exit_timeout_secs),
        ("streaming.fetch_exit_timeout_secs", streaming.fetch_exit_timeout_secs),
        ("streaming.sweep_grace_millis", streaming.sweep_grace_millis),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
        return Err(ConfigError::ValidationError(format!("{} cannot be 0", name)));
    }

    if streaming.excluded_protocol.contains(['[', ']', '/']) {
        return Err(ConfigError::ValidationError(
            "streaming.excluded_protocol must be a bare protocol name".to_string(),
        ));
    }

    Ok(())
}
