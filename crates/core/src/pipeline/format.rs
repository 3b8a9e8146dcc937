//! yt-dlp format selector construction.
//!
//! A [`FormatChain`] is an ordered list of fallbacks, most restrictive first.
//! yt-dlp tries each `/`-separated stage in turn and takes the first match.

use std::fmt;

/// Which elementary stream a chain selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn selector(&self) -> &'static str {
        match self {
            Self::Video => "bestvideo",
            Self::Audio => "bestaudio",
        }
    }

    /// Source containers in order of preference.
    fn preferred_exts(&self) -> [&'static str; 2] {
        match self {
            Self::Video => ["webm", "mp4"],
            Self::Audio => ["webm", "m4a"],
        }
    }
}

/// One fallback stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatStage {
    pub kind: StreamKind,
    pub max_height: Option<u32>,
    pub ext: Option<&'static str>,
    pub excluded_protocol: String,
}

impl FormatStage {
    /// Number of active filters besides the protocol exclusion.
    pub fn restrictiveness(&self) -> usize {
        usize::from(self.max_height.is_some()) + usize::from(self.ext.is_some())
    }
}

impl fmt::Display for FormatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.selector())?;
        if let Some(height) = self.max_height {
            write!(f, "[height<={}]", height)?;
        }
        if let Some(ext) = self.ext {
            write!(f, "[ext={}]", ext)?;
        }
        write!(f, "[protocol!={}]", self.excluded_protocol)
    }
}

/// Ordered fallback stages for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChain {
    stages: Vec<FormatStage>,
}

impl FormatChain {
    /// Video chain. With a height bound:
    /// height+webm, height+mp4, height, webm, any. Without: webm, mp4, any.
    pub fn video(max_height: Option<u32>, excluded_protocol: &str) -> Self {
        let kind = StreamKind::Video;
        let [preferred, secondary] = kind.preferred_exts();
        let stage = |max_height, ext| FormatStage {
            kind,
            max_height,
            ext,
            excluded_protocol: excluded_protocol.to_string(),
        };

        let stages = match max_height {
            Some(height) => vec![
                stage(Some(height), Some(preferred)),
                stage(Some(height), Some(secondary)),
                stage(Some(height), None),
                stage(None, Some(preferred)),
                stage(None, None),
            ],
            None => vec![
                stage(None, Some(preferred)),
                stage(None, Some(secondary)),
                stage(None, None),
            ],
        };
        Self { stages }
    }

    /// Audio chain: webm, m4a, any.
    pub fn audio(excluded_protocol: &str) -> Self {
        let kind = StreamKind::Audio;
        let stages = kind
            .preferred_exts()
            .into_iter()
            .map(Some)
            .chain([None])
            .map(|ext| FormatStage {
                kind,
                max_height: None,
                ext,
                excluded_protocol: excluded_protocol.to_string(),
            })
            .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[FormatStage] {
        &self.stages
    }

    /// The `-f` argument.
    pub fn expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FormatChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", stage)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_chain_with_quality() {
        let chain = FormatChain::video(Some(720), "m3u8");
        assert_eq!(
            chain.expression(),
            "(bestvideo[height<=720][ext=webm][protocol!=m3u8]/\
             bestvideo[height<=720][ext=mp4][protocol!=m3u8]/\
             bestvideo[height<=720][protocol!=m3u8]/\
             bestvideo[ext=webm][protocol!=m3u8]/\
             bestvideo[protocol!=m3u8])"
        );
    }

    #[test]
    fn test_video_chain_without_quality() {
        let chain = FormatChain::video(None, "m3u8");
        assert_eq!(
            chain.expression(),
            "(bestvideo[ext=webm][protocol!=m3u8]/\
             bestvideo[ext=mp4][protocol!=m3u8]/\
             bestvideo[protocol!=m3u8])"
        );
    }

    #[test]
    fn test_audio_chain() {
        let chain = FormatChain::audio("m3u8");
        assert_eq!(
            chain.expression(),
            "(bestaudio[ext=webm][protocol!=m3u8]/\
             bestaudio[ext=m4a][protocol!=m3u8]/\
             bestaudio[protocol!=m3u8])"
        );
    }

    #[test]
    fn test_chains_go_from_most_to_least_restrictive() {
        for quality in [None, Some(144), Some(480), Some(2160)] {
            let chain = FormatChain::video(quality, "m3u8");
            let stages = chain.stages();
            assert!(!stages.is_empty());

            let scores: Vec<usize> = stages.iter().map(FormatStage::restrictiveness).collect();
            assert!(
                scores.windows(2).all(|w| w[0] >= w[1]),
                "stages not ordered for {:?}: {:?}",
                quality,
                scores
            );
            // Always ends with the unconstrained fallback
            assert_eq!(stages.last().unwrap().restrictiveness(), 0);
            // Height-bounded stages come before any unbounded one
            let first_unbounded = stages.iter().position(|s| s.max_height.is_none()).unwrap();
            assert!(stages[first_unbounded..].iter().all(|s| s.max_height.is_none()));
        }
    }

    #[test]
    fn test_every_stage_excludes_protocol() {
        let chain = FormatChain::video(Some(1080), "m3u8_native");
        assert!(chain
            .stages()
            .iter()
            .all(|s| s.to_string().ends_with("[protocol!=m3u8_native]")));
    }
}
