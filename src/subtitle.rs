use std::path::Path;

use crate::media::Filter;

/// Path separator convention used when embedding a path in a filter argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Unix,
    Windows,
}

impl PathStyle {
    pub fn host() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Unix
        }
    }
}

/// Make a filesystem path safe to embed as a filtergraph argument value.
///
/// ffmpeg unescapes a filter argument twice: once while splitting the
/// graph, where the single quotes protect `,` `;` and brackets, and again
/// while splitting `key=value` options, where `:` separates pairs. So
/// inside the quotes `\` and `:` carry a backslash for the option pass,
/// and a `'` leaves the quoted run to emit `\\\'`, which survives both.
/// Backslashes become forward slashes on Windows.
pub fn escape_filter_path(path: &str, style: PathStyle) -> String {
    let normalized = match style {
        PathStyle::Windows => path.replace('\\', "/"),
        PathStyle::Unix => path.to_string(),
    };

    let mut escaped = String::with_capacity(normalized.len() + 8);
    escaped.push('\'');
    for ch in normalized.chars() {
        match ch {
            '\\' => escaped.push_str(r"\\"),
            ':' => escaped.push_str(r"\:"),
            '\'' => escaped.push_str(r"'\\\''"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('\'');
    escaped
}

/// `ass` renders ASS/SSA styling natively; everything else goes through `subtitles`
pub fn overlay_filter_name(subtitle_path: &Path) -> &'static str {
    let ext = subtitle_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("ass") | Some("ssa") => "ass",
        _ => "subtitles",
    }
}

/// Subtitle burn-in filter for the host platform
pub fn overlay_filter(subtitle_path: &Path) -> Filter {
    let escaped = escape_filter_path(&subtitle_path.to_string_lossy(), PathStyle::host());
    Filter::new(overlay_filter_name(subtitle_path)).arg("filename", escaped)
}
