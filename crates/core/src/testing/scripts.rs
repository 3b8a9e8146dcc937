//! Executable shell scripts standing in for the downloader and muxer.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes fake tools into a directory owned by the caller.
///
/// ```rust,ignore
/// let dir = tempfile::TempDir::new()?;
/// let muxer = FakeTool::write(dir.path(), "ffmpeg", "cat <&3; cat <&4");
/// ```
pub struct FakeTool;

impl FakeTool {
    /// Writes `body` as a `/bin/sh` script named `name` and makes it executable.
    ///
    /// Panics on I/O errors; intended for tests only.
    pub fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body))
            .unwrap_or_else(|e| panic!("failed to write fake tool {}: {}", path.display(), e));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|e| panic!("failed to chmod fake tool {}: {}", path.display(), e));
        path
    }

    /// A downloader that ignores its arguments and prints `output` to stdout.
    pub fn printing(dir: &Path, name: &str, output: &str) -> PathBuf {
        Self::write(dir, name, &format!("printf '%s' '{}'", output.replace('\'', r"'\''")))
    }

    /// A tool that records its arguments, one per line, into `log`.
    pub fn recording(dir: &Path, name: &str, log: &Path, then: &str) -> PathBuf {
        Self::write(
            dir,
            name,
            &format!(
                "for arg in \"$@\"; do printf '%s\\n' \"$arg\"; done >> '{}'\n{}",
                log.display(),
                then
            ),
        )
    }
}
