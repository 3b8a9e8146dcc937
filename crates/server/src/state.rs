use std::sync::Arc;

use pipestream_core::{
    ActionLog, Config, MetadataFetcher, PipelineBuilder, PipelineController, YtDlpMetadataFetcher,
};

/// Shared application state
pub struct AppState {
    config: Config,
    metadata: Arc<dyn MetadataFetcher>,
    builder: PipelineBuilder,
    controller: PipelineController,
    action_log: ActionLog,
}

impl AppState {
    pub fn new(config: Config, metadata: Arc<dyn MetadataFetcher>, action_log: ActionLog) -> Self {
        let builder = PipelineBuilder::new(
            config.tools.clone(),
            config.credentials.clone(),
            &config.streaming,
        );
        let controller =
            PipelineController::new(config.streaming.clone(), config.tools.inherit_stderr);

        Self {
            config,
            metadata,
            builder,
            controller,
            action_log,
        }
    }

    /// State backed by the real yt-dlp metadata fetcher.
    pub fn from_config(config: Config) -> Self {
        let metadata = Arc::new(YtDlpMetadataFetcher::new(&config.tools, &config.credentials));
        Self::new(config, metadata, ActionLog::new())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metadata(&self) -> &dyn MetadataFetcher {
        self.metadata.as_ref()
    }

    pub fn builder(&self) -> &PipelineBuilder {
        &self.builder
    }

    pub fn controller(&self) -> &PipelineController {
        &self.controller
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.action_log
    }
}
