//! Image acquisition: stores uploaded bytes or downloads a remote URL
//! into the content directory.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use super::format::sanitize_filename;
use super::AcquireError;

/// Browser-like identity; some image hosts refuse requests without one.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Write uploaded bytes verbatim under the content directory.
///
/// The stored name is the (sanitized) upload name; re-uploading the same
/// filename silently overwrites the previous copy.
pub fn store_upload(
    content_dir: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, AcquireError> {
    std::fs::create_dir_all(content_dir)?;

    let path = content_dir.join(sanitize_filename(filename));
    std::fs::write(&path, bytes)?;

    info!(path = %path.display(), size = bytes.len(), "Image stored from upload");
    Ok(path)
}

/// Downloads remote images into the content directory.
///
/// A download only counts when the server answers 200 with a
/// `Content-Type` that begins with `image`; anything else is rejected
/// before a single byte touches disk.
pub struct UrlFetcher {
    content_dir: PathBuf,
}

impl UrlFetcher {
    pub fn new(content_dir: PathBuf) -> Self {
        Self { content_dir }
    }

    /// Fetch `url` and persist the body as
    /// `url_image_<YYYYMMDDHHMMSS>.jpg` (the `.jpg` suffix is kept
    /// regardless of the actual format; MIME detection downstream reads
    /// the magic bytes, not the name).
    ///
    /// Must run on a thread where blocking is allowed. The client is
    /// built per call for that reason; no explicit request timeout is
    /// imposed beyond the client's own default.
    pub fn fetch(&self, url: &str) -> Result<PathBuf, AcquireError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| AcquireError::Request(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| AcquireError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(url, status = status.as_u16(), "URL fetch rejected");
            return Err(AcquireError::BadStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image") {
            warn!(url, content_type, "URL fetch rejected: not an image");
            return Err(AcquireError::NotAnImage { content_type });
        }

        // Buffer the whole body before writing so a mid-transfer failure
        // leaves nothing on disk.
        let body = response
            .bytes()
            .map_err(|e| AcquireError::Request(e.to_string()))?;

        std::fs::create_dir_all(&self.content_dir)?;
        let filename = format!("url_image_{}.jpg", Local::now().format("%Y%m%d%H%M%S"));
        let path = self.content_dir.join(filename);
        std::fs::write(&path, &body)?;

        info!(url, path = %path.display(), size = body.len(), "Image downloaded from URL");
        Ok(path)
    }
}
