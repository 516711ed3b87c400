//! Image MIME detection from magic bytes (NOT file extensions).
//! Magic bytes don't lie; extensions can be wrong.

/// Detect an image MIME type by signature.
///
/// Unidentifiable content falls back to `image/jpeg`: the inference
/// endpoint tolerates a wrong type better than a missing one, and the
/// acquisition path already restricted inputs to images.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    // PNG: 89 50 4E 47
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png";
    }
    // GIF: GIF87a / GIF89a
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "image/gif";
    }
    // WebP: RIFF....WEBP
    if bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        return "image/webp";
    }

    "image/jpeg"
}

/// Sanitize an upload filename: strip path components and null bytes.
/// The stored name stays as close to the supplied one as possible, so a
/// re-upload of the same file overwrites the previous copy.
pub fn sanitize_filename(original: &str) -> String {
    let name = std::path::Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("leaf");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "leaf".to_string()
    } else {
        clean
    }
}
