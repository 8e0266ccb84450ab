//! Media type fallback for uploaded assets.
//!
//! Used when a binary part arrives without a declared `Content-Type`.

use std::path::Path;

use pinforge_core::OCTET_STREAM;

/// Guess a media type from a filename's extension.
pub fn detect_mime_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    let mime = match ext.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "svg"          => "image/svg+xml",
        "avif"         => "image/avif",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",

        // Audio / video assets
        "mp3"          => "audio/mpeg",
        "wav"          => "audio/wav",
        "ogg"          => "audio/ogg",
        "mp4"          => "video/mp4",
        "webm"         => "video/webm",
        "glb"          => "model/gltf-binary",
        "gltf"         => "model/gltf+json",

        // Documents
        "json"         => "application/json",
        "pdf"          => "application/pdf",
        "txt"          => "text/plain",
        "html" | "htm" => "text/html",

        _ => return None,
    };
    Some(mime)
}

/// Declared media type if the client sent a specific one, else a guess
/// from the filename, else `application/octet-stream`.
pub fn resolve_media_type(declared: &str, file_name: &str) -> String {
    if !declared.is_empty() && declared != OCTET_STREAM {
        return declared.to_string();
    }
    detect_mime_type(file_name)
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Whether a media type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}
