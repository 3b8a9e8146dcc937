//! Core library for pipestream.
//!
//! Fetches video metadata with yt-dlp and serves downloads by piping two
//! yt-dlp fetch processes into an ffmpeg muxer, streaming the muxer output
//! to a client as it is produced.

pub mod action_log;
pub mod config;
pub mod cookies;
pub mod metadata;
pub mod metrics;
pub mod naming;
pub mod pipeline;
pub mod process;
pub mod testing;

pub use action_log::{ActionLog, ActionLogEntry};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, ActionLogConfig,
    Config, ConfigError, CredentialsConfig, ServerConfig, StreamingConfig, ToolsConfig,
    WebConfig,
};
pub use metadata::{MetadataError, MetadataFetcher, VideoMetadata, YtDlpMetadataFetcher};
pub use pipeline::{
    ChannelSink, ChunkSink, Container, DownloadRequest, Pipeline, PipelineBuilder,
    PipelineController, PipelineError, PipelinePlan, PipelineState, RequestError, StreamEnd,
    StreamReport,
};
pub use process::{ChildProcess, ProcessError, ProcessReport, ProcessSpec, StopOutcome};
