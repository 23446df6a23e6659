// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const FALLBACK_NAME: &str = "video_file";

static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();

/// Replaces everything except `[A-Za-z0-9._-]` with `_`.
///
/// Names that end up empty, `.` or `..` are replaced entirely.
pub fn sanitize_filename(raw: &str) -> String {
    let re = UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());
    let safe = re.replace_all(raw, "_").into_owned();
    match safe.as_str() {
        "" | "." | ".." => FALLBACK_NAME.to_string(),
        _ => safe,
    }
}

/// Name a finished conversion is published under, e.g. `konverter_1a2b3_song.mp3`.
pub fn published_name(job_uuid: &str, safe_filename: &str, extension: &str) -> String {
    let stem = Path::new(safe_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    let short: String = job_uuid.chars().take(5).collect();
    format!("konverter_{short}_{stem}.{extension}")
}
