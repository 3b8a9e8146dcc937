use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::Container;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub action_log: ActionLogConfig,
    #[serde(default)]
    pub web: WebConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

/// External executables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (looked up on PATH when bare).
    #[serde(default = "default_downloader_path")]
    pub downloader_path: PathBuf,
    /// Path to the ffmpeg executable.
    #[serde(default = "default_muxer_path")]
    pub muxer_path: PathBuf,
    /// Whether child processes write their diagnostics to our stderr.
    #[serde(default = "default_true")]
    pub inherit_stderr: bool,
    /// Upper bound for a single `--dump-json` call.
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_path: default_downloader_path(),
            muxer_path: default_muxer_path(),
            inherit_stderr: true,
            metadata_timeout_secs: default_metadata_timeout(),
        }
    }
}

impl ToolsConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

fn default_downloader_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_muxer_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_true() -> bool {
    true
}

fn default_metadata_timeout() -> u64 {
    120
}

/// Optional cookie files handed to yt-dlp.
///
/// Paths are checked on every use; a missing file is logged and skipped.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Cookie file for the metadata (`--dump-json`) call.
    #[serde(default)]
    pub info_cookie_file: Option<PathBuf>,
    /// Cookie file for the two streaming fetch processes.
    #[serde(default)]
    pub stream_cookie_file: Option<PathBuf>,
}

/// Streaming pipeline tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Maximum bytes read from the muxer per iteration.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Grace period after SIGTERM before the muxer is killed on disconnect.
    #[serde(default = "default_muxer_stop_timeout")]
    pub muxer_stop_timeout_secs: u64,
    /// How long to wait for the muxer to exit after its output reached EOF.
    #[serde(default = "default_muxer_exit_timeout")]
    pub muxer_exit_timeout_secs: u64,
    /// How long to wait for each fetch process to exit once the muxer is done.
    #[serde(default = "default_fetch_exit_timeout")]
    pub fetch_exit_timeout_secs: u64,
    /// Grace period used by the final cleanup sweep.
    #[serde(default = "default_sweep_grace")]
    pub sweep_grace_millis: u64,
    /// Default output container when the request names none or an unsupported one.
    #[serde(default)]
    pub default_container: Container,
    /// Streaming sub-protocol excluded from every format selector.
    #[serde(default = "default_excluded_protocol")]
    pub excluded_protocol: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            muxer_stop_timeout_secs: default_muxer_stop_timeout(),
            muxer_exit_timeout_secs: default_muxer_exit_timeout(),
            fetch_exit_timeout_secs: default_fetch_exit_timeout(),
            sweep_grace_millis: default_sweep_grace(),
            default_container: Container::default(),
            excluded_protocol: default_excluded_protocol(),
        }
    }
}

impl StreamingConfig {
    pub fn muxer_stop_timeout(&self) -> Duration {
        Duration::from_secs(self.muxer_stop_timeout_secs)
    }

    pub fn muxer_exit_timeout(&self) -> Duration {
        Duration::from_secs(self.muxer_exit_timeout_secs)
    }

    pub fn fetch_exit_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_exit_timeout_secs)
    }

    pub fn sweep_grace(&self) -> Duration {
        Duration::from_millis(self.sweep_grace_millis)
    }
}

fn default_chunk_size() -> usize {
    8 * 1024
}

fn default_muxer_stop_timeout() -> u64 {
    5
}

fn default_muxer_exit_timeout() -> u64 {
    120
}

fn default_fetch_exit_timeout() -> u64 {
    60
}

fn default_sweep_grace() -> u64 {
    2000
}

fn default_excluded_protocol() -> String {
    "m3u8".to_string()
}

/// Action log retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionLogConfig {
    /// Seconds an entry survives after its terminal milestone.
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            expiry_secs: default_expiry_secs(),
        }
    }
}

impl ActionLogConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

fn default_expiry_secs() -> u64 {
    2
}

/// HTML page and static asset locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("assets/templates")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("assets/static")
}
