//! Download filename and `Content-Disposition` derivation.

use crate::pipeline::Container;

/// Characters replaced with `_` in titles.
const UNSAFE_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\''];

const FALLBACK_STEM: &str = "video";

/// Replaces filesystem-unsafe characters with `_` and trims whitespace.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if UNSAFE_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `<sanitized title>.<ext>`, or `video.<ext>` when nothing usable is left.
pub fn download_filename(title: Option<&str>, container: Container) -> String {
    let stem = title.map(sanitize_title).unwrap_or_default();
    let stem = if stem.is_empty() {
        FALLBACK_STEM
    } else {
        stem.as_str()
    };
    format!("{}.{}", stem, container.extension())
}

/// ASCII-only variant of `filename` for the plain `filename=` parameter.
pub fn ascii_fallback(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `attachment` disposition with both an ASCII fallback and the RFC 6266
/// `filename*` form carrying the UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        urlencoding::encode(filename)
    )
}
