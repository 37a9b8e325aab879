//! MIME classification
//!
//! Maps the MIME types advertised by a clipboard owner to the coarse
//! [`ContentKind`] the monitor reports. Precedence is fixed: file lists beat
//! images, images beat text, everything else is unknown.

use std::fmt;

/// URI list, used for copied files
pub const URI_LIST_MIME: &str = "text/uri-list";

/// UTF-8 plain text, preferred text representation
pub const UTF8_TEXT_MIME: &str = "text/plain;charset=utf-8";

/// Plain text without charset parameter
pub const PLAIN_TEXT_MIME: &str = "text/plain";

/// Prefix shared by all image representations
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// PNG, preferred image representation
pub const PNG_MIME: &str = "image/png";

/// MIME types and X11 targets accepted as plain text
pub const TEXT_MIME_ALIASES: [&str; 6] = [
    PLAIN_TEXT_MIME,
    UTF8_TEXT_MIME,
    "STRING",
    "TEXT",
    "COMPOUND_TEXT",
    "UTF8_STRING",
];

/// Text representations tried in order when reading a text selection
pub const TEXT_MIME_PREFERENCE: [&str; 2] = [UTF8_TEXT_MIME, PLAIN_TEXT_MIME];

/// Coarse clipboard content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Plain text
    Text,
    /// Image in its source encoding
    Image,
    /// Ordered list of file URIs
    Files,
    /// Nothing the monitor reports
    Unknown,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Text => write!(f, "text"),
            ContentKind::Image => write!(f, "image"),
            ContentKind::Files => write!(f, "files"),
            ContentKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a set of advertised MIME types.
///
/// First match wins:
/// 1. contains `text/uri-list` → [`ContentKind::Files`]
/// 2. any entry starts with `image/` → [`ContentKind::Image`]
/// 3. any entry is a known text alias → [`ContentKind::Text`]
/// 4. otherwise [`ContentKind::Unknown`]
pub fn classify<S: AsRef<str>>(mime_types: &[S]) -> ContentKind {
    let mut has_image = false;
    let mut has_text = false;

    for mime in mime_types.iter().map(AsRef::as_ref) {
        if mime == URI_LIST_MIME {
            return ContentKind::Files;
        }
        has_image |= mime.starts_with(IMAGE_MIME_PREFIX);
        has_text |= TEXT_MIME_ALIASES.contains(&mime);
    }

    if has_image {
        ContentKind::Image
    } else if has_text {
        ContentKind::Text
    } else {
        ContentKind::Unknown
    }
}

/// Pick the representation to read for an image selection.
///
/// Any `image/png` variant wins; otherwise the first advertised MIME type is
/// used as-is.
pub fn preferred_image_mime<S: AsRef<str>>(mime_types: &[S]) -> Option<&str> {
    mime_types
        .iter()
        .map(AsRef::as_ref)
        .find(|mime| mime.starts_with(PNG_MIME))
        .or_else(|| mime_types.first().map(AsRef::as_ref))
}

/// Split a newline-separated listing into trimmed, non-empty lines.
///
/// Accepts CRLF, CR and LF line endings. Used for `TARGETS` / `--list-types`
/// output and for `text/uri-list` payloads.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the raw output of a MIME listing command.
///
/// The listing is informational only, so invalid UTF-8 is replaced rather
/// than rejected.
pub fn parse_mime_list(raw: &[u8]) -> Vec<String> {
    split_lines(&String::from_utf8_lossy(raw))
}
