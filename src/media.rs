//! Image payload helpers
//!
//! Reads local image files into base64 inline payloads and writes decoded
//! payloads back to disk.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum number of reference images accepted in one request
pub const MAX_REFERENCE_IMAGES: usize = 14;

/// A base64-encoded image ready to be sent as an inline part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    /// Base64 image bytes
    pub data: String,
    /// MIME type (e.g. `image/png`)
    pub mime_type: String,
}

impl EncodedImage {
    /// Wrap already-encoded base64 data
    #[must_use]
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Encode raw image bytes
    #[must_use]
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::new(BASE64.encode(bytes), mime_type)
    }
}

/// Infer the MIME type from a file extension
///
/// Only `.png` is recognized; everything else is sent as JPEG.
#[must_use]
pub fn mime_type_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Read and encode a single image file
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn encode_image_file(path: &Path) -> Result<EncodedImage> {
    let bytes = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "encoded image file");
    Ok(EncodedImage::from_bytes(&bytes, mime_type_for_path(path)))
}

/// Read and encode a batch of reference images, preserving input order
///
/// # Errors
///
/// Returns error if more than [`MAX_REFERENCE_IMAGES`] paths are given or a
/// file cannot be read
pub fn encode_image_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<EncodedImage>> {
    if paths.len() > MAX_REFERENCE_IMAGES {
        return Err(Error::TooManyImages {
            count: paths.len(),
            max: MAX_REFERENCE_IMAGES,
        });
    }

    paths
        .iter()
        .map(|path| encode_image_file(path.as_ref()))
        .collect()
}

/// Decode a base64 payload into raw bytes
///
/// # Errors
///
/// Returns error if the payload is not valid base64
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(data.trim())?)
}

/// Decode a base64 payload and write it to `path`
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns error if decoding fails or the file cannot be written
pub fn save_base64_image(data: &str, path: &Path) -> Result<()> {
    let bytes = decode_base64(data)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved image");
    Ok(())
}
