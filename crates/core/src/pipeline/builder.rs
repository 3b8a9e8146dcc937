//! Builds the fetch and muxer command lines for a download.

use crate::config::{CredentialsConfig, StreamingConfig, ToolsConfig};
use crate::cookies::cookie_args;

use super::format::FormatChain;
use super::types::{CommandLine, Container, DownloadRequest, PipelinePlan};

/// Descriptor the muxer reads the video stream from.
pub const VIDEO_INPUT_FD: i32 = 3;
/// Descriptor the muxer reads the audio stream from.
pub const AUDIO_INPUT_FD: i32 = 4;

/// Turns a [`DownloadRequest`] into a [`PipelinePlan`].
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    tools: ToolsConfig,
    credentials: CredentialsConfig,
    excluded_protocol: String,
}

impl PipelineBuilder {
    pub fn new(
        tools: ToolsConfig,
        credentials: CredentialsConfig,
        streaming: &StreamingConfig,
    ) -> Self {
        Self {
            tools,
            credentials,
            excluded_protocol: streaming.excluded_protocol.clone(),
        }
    }

    pub fn build(&self, request: &DownloadRequest) -> PipelinePlan {
        let video_format = FormatChain::video(request.quality, &self.excluded_protocol);
        let audio_format = FormatChain::audio(&self.excluded_protocol);

        PipelinePlan {
            video: self.fetch_command(&video_format, &request.url),
            audio: self.fetch_command(&audio_format, &request.url),
            muxer: self.muxer_command(request.container),
            container: request.container,
        }
    }

    /// `<tool> [--cookies f] --no-playlist -f <expr> -o - -- <url>`
    fn fetch_command(&self, format: &FormatChain, url: &str) -> CommandLine {
        let mut args = cookie_args(self.credentials.stream_cookie_file.as_deref(), "stream");
        args.extend([
            "--no-playlist".to_string(),
            "-f".to_string(),
            format.expression(),
            "-o".to_string(),
            "-".to_string(),
            // URL always follows the end-of-options marker
            "--".to_string(),
            url.to_string(),
        ]);

        CommandLine {
            program: self.tools.downloader_path.clone(),
            args,
        }
    }

    fn muxer_command(&self, container: Container) -> CommandLine {
        let mut args: Vec<String> = vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            format!("pipe:{}", VIDEO_INPUT_FD),
            "-i".to_string(),
            format!("pipe:{}", AUDIO_INPUT_FD),
        ];
        args.extend(
            ["-map", "0:v", "-map", "1:a", "-c:v", "copy", "-c:a", "copy"]
                .iter()
                .map(|s| s.to_string()),
        );

        args.extend(container.muxer_flags().iter().map(|s| s.to_string()));
        args.extend([
            "-f".to_string(),
            container.muxer_format().to_string(),
            "pipe:1".to_string(),
        ]);

        CommandLine {
            program: self.tools.muxer_path.clone(),
            args,
        }
    }
}
