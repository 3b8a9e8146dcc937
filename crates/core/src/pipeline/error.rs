use std::io;
use thiserror::Error;

use crate::process::ProcessError;

/// Errors from spawning or running a streaming pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A process could not be started. Processes started before it were killed.
    #[error("failed to start {stage} process: {source}")]
    SpawnFailed {
        stage: &'static str,
        #[source]
        source: ProcessError,
    },

    #[error("failed to create pipe: {0}")]
    Io(#[from] io::Error),

    /// Reading the muxer output failed mid-stream.
    #[error("reading muxer output failed: {0}")]
    Stream(#[source] io::Error),

    /// Forwarding a chunk to the client failed for a reason other than a disconnect.
    #[error("forwarding stream chunk failed: {0}")]
    Forward(#[source] io::Error),
}

impl PipelineError {
    pub fn spawn_failed(stage: &'static str, source: ProcessError) -> Self {
        Self::SpawnFailed { stage, source }
    }

    /// Whether the failure happened before any output was produced.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. } | Self::Io(_))
    }
}
