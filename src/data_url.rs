//! `data:<mime>;base64,<payload>` handling for uploaded photos and generated avatars.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid data URL format. Could not extract mimeType and data.")]
    InvalidDataUrl,
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Failed to read image file: {0}")]
    Io(String),
}

/// Inline image payload as sent to the generation API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePart {
    pub mime_type: String,
    pub data: String,
}

impl ImagePart {
    pub fn to_data_url(&self) -> String {
        to_data_url(&self.mime_type, &self.data)
    }
}

// Line terminators never match inside a data URL component.
fn has_line_break(s: &str) -> bool {
    s.chars()
        .any(|c| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}'))
}

/// Split a data URL into its mime type and base64 payload.
///
/// The mime type extends to the last `;base64,` marker that still leaves a
/// non-empty payload, so both parts are taken verbatim without validating
/// the payload alphabet.
pub fn decode_data_url(data_url: &str) -> Result<ImagePart, FormatError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or(FormatError::InvalidDataUrl)?;
    if has_line_break(rest) {
        return Err(FormatError::InvalidDataUrl);
    }

    let marker = rest
        .rmatch_indices(BASE64_MARKER)
        .map(|(idx, _)| idx)
        .find(|&idx| idx > 0 && idx + BASE64_MARKER.len() < rest.len())
        .ok_or(FormatError::InvalidDataUrl)?;
    let mime_type = &rest[..marker];
    let data = &rest[marker + BASE64_MARKER.len()..];

    Ok(ImagePart {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

pub fn to_data_url(mime_type: &str, base64_payload: &str) -> String {
    format!("data:{}{}{}", mime_type, BASE64_MARKER, base64_payload)
}

pub fn encode_bytes(mime_type: &str, bytes: &[u8]) -> String {
    to_data_url(mime_type, &STANDARD.encode(bytes))
}

/// Decode the payload to raw bytes, e.g. for saving an avatar to disk
pub fn decode_bytes(data_url: &str) -> Result<(String, Vec<u8>), FormatError> {
    let part = decode_data_url(data_url)?;
    let bytes = STANDARD
        .decode(part.data.as_bytes())
        .map_err(|e| FormatError::InvalidBase64(e.to_string()))?;
    Ok((part.mime_type, bytes))
}

/// Decode `data_url` and write the raw image bytes to `path`
pub fn write_image_file(data_url: &str, path: &Path) -> Result<(), FormatError> {
    let (mime, bytes) = decode_bytes(data_url)?;
    std::fs::write(path, &bytes).map_err(|e| FormatError::Io(e.to_string()))?;
    debug!("Wrote {} ({} bytes) to {:?}", mime, bytes.len(), path);
    Ok(())
}

/// Read an image file into a data URL, guessing the mime type from its extension
pub fn read_image_file(path: &Path) -> Result<String, FormatError> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(FormatError::UnsupportedType(mime.essence_str().to_string()));
    }
    let bytes = std::fs::read(path).map_err(|e| FormatError::Io(e.to_string()))?;
    debug!("Read image {:?}: {} bytes ({})", path, bytes.len(), mime);
    Ok(encode_bytes(mime.essence_str(), &bytes))
}
