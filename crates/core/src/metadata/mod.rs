//! Video metadata lookup.
//!
//! Provides the `MetadataFetcher` trait and the yt-dlp backed implementation
//! used before a stream starts, to learn the title for the download filename
//! and to reject URLs the downloader cannot handle.

mod error;
mod traits;
mod types;
mod ytdlp;

pub use error::MetadataError;
pub use traits::MetadataFetcher;
pub use types::VideoMetadata;
pub use ytdlp::YtDlpMetadataFetcher;
