//! Image attachments sent along a user message.

use std::io;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use luau_forge_model::InlineImage;
use thiserror::Error;

/// Error returned by [`load_image`].
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The file could not be read.
    #[error("cannot read attachment: {0}")]
    Io(#[from] io::Error),
    /// The file is not one of the supported image types.
    #[error("unsupported attachment type: {0:?}")]
    UnsupportedType(String),
}

/// Returns the MIME type for an image file extension.
pub fn image_mime_type(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}

/// Reads an image file and encodes it for sending along a message.
pub fn load_image(path: impl AsRef<Path>) -> Result<InlineImage, AttachmentError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let mime_type = image_mime_type(extension)
        .ok_or_else(|| AttachmentError::UnsupportedType(extension.to_owned()))?;

    let bytes = std::fs::read(path)?;
    debug!("attached {} ({} bytes)", path.display(), bytes.len());
    Ok(InlineImage {
        data: STANDARD.encode(bytes),
        mime_type: mime_type.to_owned(),
    })
}
