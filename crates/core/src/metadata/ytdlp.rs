//! yt-dlp backed metadata fetcher.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{CredentialsConfig, ToolsConfig};
use crate::cookies::cookie_args;
use crate::metrics::{METADATA_FETCHES, METADATA_FETCH_DURATION};

use super::error::MetadataError;
use super::traits::MetadataFetcher;
use super::types::VideoMetadata;

/// Runs `yt-dlp --dump-json` and parses its output.
#[derive(Debug, Clone)]
pub struct YtDlpMetadataFetcher {
    program: PathBuf,
    cookie_file: Option<PathBuf>,
    timeout: Duration,
}

impl YtDlpMetadataFetcher {
    pub fn new(tools: &ToolsConfig, credentials: &CredentialsConfig) -> Self {
        Self {
            program: tools.downloader_path.clone(),
            cookie_file: credentials.info_cookie_file.clone(),
            timeout: tools.metadata_timeout(),
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string()];
        args.extend(cookie_args(self.cookie_file.as_deref(), "info"));
        args.extend([
            "--no-playlist".to_string(),
            "--".to_string(),
            url.to_string(),
        ]);
        args
    }

    async fn run(&self, url: &str) -> Result<VideoMetadata, MetadataError> {
        let child = Command::new(&self.program)
            .args(self.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MetadataError::ToolNotFound {
                        path: self.program.clone(),
                    }
                } else {
                    MetadataError::Io(e)
                }
            })?;

        // Dropping the wait future on timeout kills the child
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MetadataError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            let stderr = decode_stderr(&output.stderr);
            return Err(MetadataError::fetch_failed(
                output.status.code(),
                stderr.trim(),
            ));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| MetadataError::parse_failed("output is not valid UTF-8"))?;
        serde_json::from_str(stdout.trim())
            .map_err(|e| MetadataError::parse_failed(format!("invalid JSON: {}", e)))
    }
}

#[async_trait]
impl MetadataFetcher for YtDlpMetadataFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(&self, url: &str) -> Result<VideoMetadata, MetadataError> {
        let started = Instant::now();
        debug!(url, "Fetching video info");

        let result = self.run(url).await;
        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        METADATA_FETCHES.with_label_values(&[label]).inc();
        METADATA_FETCH_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(url, error = %e, "Video info fetch failed");
        }
        result
    }
}

/// Decodes tool stderr as UTF-8, falling back to Latin-1 so decoding never fails.
fn decode_stderr(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
