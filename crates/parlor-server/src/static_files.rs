//! Static asset collaborator: URL path → file bytes + content type.
//!
//! Serves a single public directory for non-upgrade requests. `/` maps to
//! `index.html`; a path containing anything but plain components (dot-dot,
//! absolute roots) is refused before touching the filesystem.

use std::path::{Component, Path, PathBuf};

/// Resolves URL paths against one public directory.
pub struct StaticFiles {
    root: PathBuf,
}

/// Outcome of resolving a URL path.
#[derive(Debug, PartialEq, Eq)]
pub enum StaticResponse {
    /// File found and read.
    Found {
        /// File contents.
        bytes: Vec<u8>,
        /// Content type derived from the file extension.
        content_type: &'static str,
    },
    /// The path tried to escape the public directory.
    Forbidden,
    /// No such file.
    NotFound,
}

/// Content type for a file path, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("ico") => "image/x-icon",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl StaticFiles {
    /// Serve files from `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve a URL path (query already stripped) to file bytes.
    pub async fn resolve(&self, url_path: &str) -> StaticResponse {
        let relative = url_path.trim_start_matches('/');
        let relative = if relative.is_empty() { "index.html" } else { relative };

        let path = Path::new(relative);
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return StaticResponse::Forbidden;
        }

        let full = self.root.join(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => StaticResponse::Found {
                content_type: content_type_for(&full),
                bytes,
            },
            Err(_) => StaticResponse::NotFound,
        }
    }
}
