//! Content receiver
//!
//! Chooses which MIME representation to request for a classified selection
//! and decodes the answer. Strategies plug in their transport through
//! [`ContentSource`].

use tracing::debug;

use super::content::{decode_text, decode_uri_list, ClipboardValue};
use super::error::Result;
use super::mime::{
    preferred_image_mime, ContentKind, TEXT_MIME_ALIASES, TEXT_MIME_PREFERENCE, URI_LIST_MIME,
};

/// Transport that can fetch one representation of the current selection
pub trait ContentSource {
    /// Read the selection as `mime_type`.
    ///
    /// `Ok(None)` means the representation is not on offer.
    fn receive(&mut self, mime_type: &str) -> Result<Option<Vec<u8>>>;
}

/// Read and decode the current selection.
///
/// * Text: UTF-8 text is tried first, then plain text, then any other
///   advertised text target. The first non-empty answer wins.
/// * Image: a PNG variant if advertised, otherwise the first advertised type.
/// * Files: `text/uri-list`, split into entries.
///
/// Returns `Ok(None)` when nothing usable was read.
pub fn receive_value<S, M>(
    source: &mut S,
    kind: ContentKind,
    mime_types: &[M],
) -> Result<Option<ClipboardValue>>
where
    S: ContentSource + ?Sized,
    M: AsRef<str>,
{
    match kind {
        ContentKind::Text => {
            let mut candidates: Vec<&str> = TEXT_MIME_PREFERENCE.to_vec();
            candidates.extend(mime_types.iter().map(AsRef::as_ref).filter(|mime| {
                TEXT_MIME_ALIASES.contains(mime) && !TEXT_MIME_PREFERENCE.contains(mime)
            }));

            for mime_type in candidates {
                let Some(data) = source.receive(mime_type)? else {
                    continue;
                };
                if let Some(text) = decode_text(data, mime_type)? {
                    return Ok(Some(ClipboardValue::Text(text)));
                }
                debug!("Empty text payload for {}", mime_type);
            }
            Ok(None)
        }

        ContentKind::Image => {
            let Some(mime_type) = preferred_image_mime(mime_types) else {
                return Ok(None);
            };
            match source.receive(mime_type)? {
                Some(data) if !data.is_empty() => Ok(Some(ClipboardValue::Image {
                    data,
                    mime_type: mime_type.to_string(),
                })),
                _ => Ok(None),
            }
        }

        ContentKind::Files => match source.receive(URI_LIST_MIME)? {
            Some(data) => Ok(decode_uri_list(data, URI_LIST_MIME)?.map(ClipboardValue::Files)),
            None => Ok(None),
        },

        ContentKind::Unknown => Ok(None),
    }
}
