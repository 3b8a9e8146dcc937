//! Types for the streaming pipeline.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::process::ProcessReport;

/// Output container produced by the muxer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// Matroska.
    #[default]
    Mkv,
    /// Fragmented MP4.
    Mp4,
}

impl Container {
    /// All supported containers.
    pub const ALL: [Container; 2] = [Container::Mkv, Container::Mp4];

    /// Parses a request value, coercing anything unsupported to `default`.
    pub fn from_request(value: Option<&str>, default: Container) -> Container {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return default;
        };

        match Self::parse(raw) {
            Some(container) => container,
            None => {
                warn!(
                    requested = raw,
                    fallback = %default,
                    "Unsupported output container requested, using default"
                );
                default
            }
        }
    }

    /// Exact, case-insensitive parse.
    pub fn parse(value: &str) -> Option<Container> {
        Self::ALL
            .into_iter()
            .find(|c| c.extension().eq_ignore_ascii_case(value))
    }

    /// Name passed to the muxer's `-f`.
    pub fn muxer_format(&self) -> &'static str {
        match self {
            Self::Mkv => "matroska",
            Self::Mp4 => "mp4",
        }
    }

    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mkv => "mkv",
            Self::Mp4 => "mp4",
        }
    }

    /// MIME type for the `Content-Type` header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mkv => "video/x-matroska",
            Self::Mp4 => "video/mp4",
        }
    }

    /// Extra muxer flags needed to write the container to a non-seekable pipe.
    pub fn muxer_flags(&self) -> &'static [&'static str] {
        match self {
            Self::Mkv => &[],
            Self::Mp4 => &["-movflags", "frag_keyframe+empty_moov+faststart"],
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

static QUALITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,5})[pP]?$").unwrap());

/// Parses a quality preference such as `"720"` or `"1080p"`.
///
/// Empty input is "no preference"; anything unparsable is ignored with a warning.
pub fn parse_quality(value: Option<&str>) -> Option<u32> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;

    let height = QUALITY_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|h| *h > 0);

    if height.is_none() {
        warn!(quality = raw, "Ignoring unparsable quality preference");
    }
    height
}

/// Errors for malformed download requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("URL parameter is missing.")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download ID parameter is missing.")]
    MissingDownloadId,
}

/// A validated download request. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    /// Maximum vertical resolution.
    pub quality: Option<u32>,
    pub container: Container,
    pub download_id: String,
}

impl DownloadRequest {
    /// Validates raw form values.
    pub fn parse(
        url: Option<&str>,
        quality: Option<&str>,
        container: Option<&str>,
        download_id: Option<&str>,
        default_container: Container,
    ) -> Result<Self, RequestError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(RequestError::MissingUrl)?;

        let parsed = Url::parse(url).map_err(|e| RequestError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RequestError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let download_id = download_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(RequestError::MissingDownloadId)?;

        Ok(Self {
            url: url.to_string(),
            quality: parse_quality(quality),
            container: Container::from_request(container, default_container),
            download_id: download_id.to_string(),
        })
    }
}

/// One fully-resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Shell-ish rendering for logs.
    pub fn display(&self) -> String {
        let mut rendered = self.program.display().to_string();
        for arg in &self.args {
            rendered.push(' ');
            if arg.is_empty() || arg.contains([' ', '(', ')', '[', ']', '\'', '"', '&', '?']) {
                rendered.push('\'');
                rendered.push_str(&arg.replace('\'', r"'\''"));
                rendered.push('\'');
            } else {
                rendered.push_str(arg);
            }
        }
        rendered
    }
}

/// The three command lines that make up one streaming download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    pub video: CommandLine,
    pub audio: CommandLine,
    pub muxer: CommandLine,
    pub container: Container,
}

/// Lifecycle of a running pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Building,
    Spawned,
    Streaming,
    Draining,
    Terminated,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "building",
            Self::Spawned => "spawned",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// How the streaming loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEnd {
    /// The muxer reached EOF.
    Completed,
    /// The client went away.
    ClientDisconnected,
}

/// Summary of one streaming run.
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub end: StreamEnd,
    pub final_state: PipelineState,
    pub bytes_sent: u64,
    pub chunks_sent: u64,
    pub video: ProcessReport,
    pub audio: ProcessReport,
    pub muxer: ProcessReport,
}

impl StreamReport {
    /// Whether every process exited with status 0.
    pub fn all_succeeded(&self) -> bool {
        [&self.video, &self.audio, &self.muxer]
            .iter()
            .all(|p| p.exit_code == Some(0))
    }
}
