//! Types for the metadata module.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata reported by the downloader for a single video.
///
/// Only the fields the server uses are typed; everything else is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub title: Option<String>,
    /// Extension of the downloader's preferred format.
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoMetadata {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Title if present and not blank.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_unknown_fields() {
        let json = r#"{"title": "Clip", "ext": "webm", "duration": 42, "id": "abc"}"#;
        let meta: VideoMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(meta.title(), Some("Clip"));
        assert_eq!(meta.ext.as_deref(), Some("webm"));
        assert_eq!(meta.extra.get("duration"), Some(&Value::from(42)));
        assert_eq!(meta.extra.get("id"), Some(&Value::from("abc")));
    }

    #[test]
    fn test_missing_or_blank_title() {
        let meta: VideoMetadata = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(meta.title(), None);

        let meta = VideoMetadata::with_title("   ");
        assert_eq!(meta.title(), None);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(serde_json::from_str::<VideoMetadata>("[1, 2]").is_err());
        assert!(serde_json::from_str::<VideoMetadata>("\"title\"").is_err());
    }
}
