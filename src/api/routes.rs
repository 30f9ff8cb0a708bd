use reqwest::Url;

pub const SYSTEM_INFO: &str = "/api/system-info";
pub const FILES: &str = "/api/files";
pub const UPLOAD: &str = "/api/upload";
pub const UPLOAD_IMAGE: &str = "/api/upload-image";
pub const CHAT: &str = "/api/chat";

// Short paths the development proxy used to forward onto `/api`.
const LEGACY_PREFIXES: [&str; 6] = [
    "/upload",
    "/system-info",
    "/check-assistant",
    "/vector-stores",
    "/chat",
    "/files",
];

pub fn file(file_id: &str) -> String {
    format!("{FILES}/{}", encode_segment(file_id))
}

pub fn file_download(file_id: &str) -> String {
    format!("{FILES}/{}/download", encode_segment(file_id))
}

/// Percent-encodes one path segment, including `/`, `?` and `#`.
fn encode_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Maps a legacy short path such as `/files/abc` onto `/api/files/abc`.
/// Paths already under `/api` and unknown paths are returned unchanged.
pub fn rewrite_legacy_path(path: &str) -> String {
    if path == "/api" || path.starts_with("/api/") {
        return path.to_string();
    }

    for prefix in LEGACY_PREFIXES {
        let Some(rest) = path.strip_prefix(prefix) else {
            continue;
        };
        // `/uploads` must not match `/upload`.
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
            return format!("/api{path}");
        }
    }

    path.to_string()
}
