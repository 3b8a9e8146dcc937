//! Error types for the metadata module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching video metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Downloader binary not found.
    #[error("Downloader not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The downloader ran and reported a failure.
    #[error("Metadata fetch failed (exit code {exit_code:?}): {stderr}")]
    FetchFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The downloader succeeded but its output was not usable.
    #[error("Failed to parse video info: {reason}")]
    ParseFailed { reason: String },

    /// The downloader did not finish in time and was killed.
    #[error("Metadata fetch timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while running the downloader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    pub fn fetch_failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::FetchFailed {
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn parse_failed(reason: impl Into<String>) -> Self {
        Self::ParseFailed {
            reason: reason.into(),
        }
    }

    /// Label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::FetchFailed { .. } => "failed",
            Self::ParseFailed { .. } => "parse_error",
            Self::Timeout { .. } => "timeout",
            Self::Io(_) => "error",
        }
    }
}
