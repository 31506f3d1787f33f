use base64::Engine;
use std::borrow::Cow;
use std::path::PathBuf;

use crate::cover_art::{CoverArtStore, RECOGNISED_EXTENSIONS};
use crate::error::Result;
use crate::state::SharedState;
use crate::types::{Field, MetadataItem};

/// Extension used when the picture bytes match no known image signature
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Decodes routed items and writes them into the shared state
pub struct PayloadProcessor {
    state: SharedState,
    covers: CoverArtStore,
}

impl PayloadProcessor {
    pub fn new(state: SharedState, covers: CoverArtStore) -> Self {
        Self { state, covers }
    }

    /// Apply one item. On error the state is left exactly as it was.
    pub fn process(&self, field: Field, item: &MetadataItem) -> Result<()> {
        let bytes = decode_base64(&item.payload_base64)?;

        match field.text_field() {
            Some(text_field) => {
                let text = decode_text(&bytes);
                log::debug!("{:?} -> {:?}", field, text);
                self.state.update_field(text_field, text);
            }
            None => {
                let path = self.save_picture(&bytes)?;
                log::info!("New cover art: {:?}", path);
                self.state.update_picture(path);
            }
        }

        Ok(())
    }

    fn save_picture(&self, bytes: &[u8]) -> Result<PathBuf> {
        let extension = detect_extension(bytes);
        self.covers.save(bytes, extension)
    }
}

/// Decode standard base64, tolerating whitespace the stream may wrap payloads with
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let compact: Cow<'_, str> = if payload.contains(char::is_whitespace) {
        Cow::Owned(payload.chars().filter(|c| !c.is_whitespace()).collect())
    } else {
        Cow::Borrowed(payload)
    };

    Ok(base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?)
}

/// Bytes to text, replacing invalid UTF-8 sequences with U+FFFD
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// File extension for an image payload, judged by its signature.
///
/// Always one of `RECOGNISED_EXTENSIONS`, so `most_recent` can find every saved cover.
pub fn detect_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(format) => format
            .extensions_str()
            .iter()
            .copied()
            .find(|ext| RECOGNISED_EXTENSIONS.contains(ext))
            .unwrap_or_else(|| {
                log::debug!("No cover extension for {:?}, using .{}", format, DEFAULT_IMAGE_EXTENSION);
                DEFAULT_IMAGE_EXTENSION
            }),
        Err(e) => {
            log::debug!("Unrecognised image format ({}), using .{}", e, DEFAULT_IMAGE_EXTENSION);
            DEFAULT_IMAGE_EXTENSION
        }
    }
}
