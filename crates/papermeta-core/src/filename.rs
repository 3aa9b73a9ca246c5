use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Used when neither the title nor the source stem leaves anything usable.
pub const UNTITLED: &str = "untitled";

/// Turn arbitrary text into a portable file name stem.
///
/// Whitespace runs become a single `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed, repeated underscores collapse, and
/// leading/trailing underscores are trimmed. The result is idempotent:
/// sanitizing an already sanitized string returns it unchanged.
pub fn sanitize_filename(text: &str) -> String {
    static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    static DISALLOWED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_.\-]").unwrap());
    static UNDERSCORES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__+").unwrap());

    let s = WHITESPACE_RE.replace_all(text, "_");
    let s = DISALLOWED_RE.replace_all(&s, "");
    let s = UNDERSCORES_RE.replace_all(&s, "_");
    s.trim_matches('_').to_string()
}

/// Sanitized base name of `path` without its extension.
///
/// Returns an empty string when the stem has no ASCII-safe characters.
pub fn fallback_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| sanitize_filename(&stem.to_string_lossy()))
        .unwrap_or_default()
}
