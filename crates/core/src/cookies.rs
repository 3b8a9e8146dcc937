//! Optional yt-dlp cookie files.

use std::path::{Path, PathBuf};
use tracing::warn;

/// Returns the cookie file if it exists on disk.
///
/// A configured but missing file is logged and skipped: the tool then runs
/// without `--cookies` instead of failing the request.
pub fn resolve_cookie_file(configured: Option<&Path>, purpose: &str) -> Option<PathBuf> {
    let path = configured?;
    if path.is_file() {
        Some(path.to_path_buf())
    } else {
        warn!(
            path = %path.display(),
            purpose,
            "Cookie file configured but not found, proceeding without cookies"
        );
        None
    }
}

/// `--cookies <file>` when a usable cookie file is configured.
pub fn cookie_args(configured: Option<&Path>, purpose: &str) -> Vec<String> {
    match resolve_cookie_file(configured, purpose) {
        Some(path) => vec!["--cookies".to_string(), path.to_string_lossy().into_owned()],
        None => Vec::new(),
    }
}
