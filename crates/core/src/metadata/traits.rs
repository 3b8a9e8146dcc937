//! Trait definitions for the metadata module.

use async_trait::async_trait;

use super::error::MetadataError;
use super::types::VideoMetadata;

/// Looks up information about a video URL without downloading it.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Fetches metadata for `url`.
    async fn fetch(&self, url: &str) -> Result<VideoMetadata, MetadataError>;
}
