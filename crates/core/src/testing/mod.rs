//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`MetadataFetcher`](crate::metadata::MetadataFetcher),
//! in-memory chunk sinks and fake tool scripts, so the HTTP layer and the
//! streaming pipeline can be exercised without yt-dlp or ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipestream_core::testing::{scripts::FakeTool, MockMetadataFetcher, RecordingSink};
//!
//! let dir = tempfile::TempDir::new()?;
//! let video = FakeTool::printing(dir.path(), "video", "VIDEO");
//! let muxer = FakeTool::write(dir.path(), "ffmpeg", "cat <&3; cat <&4");
//!
//! let mut sink = RecordingSink::new();
//! pipeline.stream(&mut sink).await?;
//! ```

mod mock_metadata_fetcher;
pub mod scripts;
mod sinks;

pub use mock_metadata_fetcher::MockMetadataFetcher;
pub use sinks::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::pipeline::{CommandLine, Container, DownloadRequest, PipelinePlan};

    /// A valid request for `https://example.com/watch?v=test`.
    pub fn download_request(download_id: &str) -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/watch?v=test".to_string(),
            quality: None,
            container: Container::Mkv,
            download_id: download_id.to_string(),
        }
    }

    /// A plan running the given programs without arguments.
    pub fn plan(video: &Path, audio: &Path, muxer: &Path) -> PipelinePlan {
        let command = |program: &Path| CommandLine {
            program: program.to_path_buf(),
            args: Vec::new(),
        };
        PipelinePlan {
            video: command(video),
            audio: command(audio),
            muxer: command(muxer),
            container: Container::Mkv,
        }
    }
}
