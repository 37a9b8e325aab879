//! Clipboard values
//!
//! The decoded payload handed to the update callback, plus the decoders that
//! turn raw selection bytes into it.

use super::error::{MonitorError, Result};
use super::mime::{split_lines, ContentKind};

/// Decoded clipboard content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardValue {
    /// UTF-8 text
    Text(String),
    /// Raw image bytes in the representation they were read as
    Image {
        /// Encoded image data
        data: Vec<u8>,
        /// MIME type the bytes were requested as
        mime_type: String,
    },
    /// File URIs in clipboard order
    Files(Vec<String>),
}

impl ClipboardValue {
    /// Category of this value
    pub fn kind(&self) -> ContentKind {
        match self {
            ClipboardValue::Text(_) => ContentKind::Text,
            ClipboardValue::Image { .. } => ContentKind::Image,
            ClipboardValue::Files(_) => ContentKind::Files,
        }
    }

    /// Short description for logs, never the payload itself
    pub fn summary(&self) -> String {
        match self {
            ClipboardValue::Text(text) => format!("text ({} chars)", text.chars().count()),
            ClipboardValue::Image { data, mime_type } => {
                format!("image ({}, {} bytes)", mime_type, data.len())
            }
            ClipboardValue::Files(uris) => format!("files ({} entries)", uris.len()),
        }
    }

    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClipboardValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Image bytes, if this is an image value
    pub fn as_image(&self) -> Option<&[u8]> {
        match self {
            ClipboardValue::Image { data, .. } => Some(data),
            _ => None,
        }
    }

    /// File URIs, if this is a file list
    pub fn as_files(&self) -> Option<&[String]> {
        match self {
            ClipboardValue::Files(uris) => Some(uris),
            _ => None,
        }
    }
}

/// Decode a text payload.
///
/// Returns `Ok(None)` for an empty payload.
pub fn decode_text(data: Vec<u8>, mime_type: &str) -> Result<Option<String>> {
    if data.is_empty() {
        return Ok(None);
    }
    String::from_utf8(data)
        .map(Some)
        .map_err(|_| MonitorError::InvalidUtf8 {
            mime_type: mime_type.to_string(),
        })
}

/// Decode a `text/uri-list` payload into its non-empty entries.
///
/// Returns `Ok(None)` when no entries remain after trimming.
pub fn decode_uri_list(data: Vec<u8>, mime_type: &str) -> Result<Option<Vec<String>>> {
    let Some(text) = decode_text(data, mime_type)? else {
        return Ok(None);
    };
    let uris = split_lines(&text);
    Ok((!uris.is_empty()).then_some(uris))
}
