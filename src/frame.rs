use std::fmt;

use crate::tokenizer::{Token, Tokenizer};
use crate::types::MetadataItem;

pub const ITEM_CLOSE: &str = "</item>";

/// Default upper bound on buffered text without a closing `</item>`.
/// Cover art arrives base64-encoded in a single item, so this must comfortably
/// exceed the largest expected artwork.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 32 * 1024 * 1024;

/// Accumulates trimmed stream lines until one or more `</item>` delimiters arrive
pub struct FrameAssembler {
    buf: String,
    max_len: usize,
}

impl FrameAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: String::new(),
            max_len,
        }
    }

    /// Append one line and return every frame it completed, in stream order.
    ///
    /// Completed frames leave the buffer immediately whether or not they later
    /// decode. If the buffer grows past the limit without a delimiter it is
    /// discarded.
    pub fn push_line(&mut self, line: &str) -> Vec<String> {
        // A delimiter may straddle the previous tail and the new line
        let mut search_from = self.buf.len().saturating_sub(ITEM_CLOSE.len() - 1);
        while !self.buf.is_char_boundary(search_from) {
            search_from -= 1;
        }

        self.buf.push_str(line.trim());

        let mut frames = Vec::new();
        while let Some(pos) = self.buf[search_from..].find(ITEM_CLOSE) {
            let end = search_from + pos + ITEM_CLOSE.len();
            frames.push(self.buf.drain(..end).collect());
            search_from = 0;
        }

        if self.buf.len() > self.max_len {
            log::warn!(
                "Discarding {} buffered bytes: no {} within {} bytes",
                self.buf.len(),
                ITEM_CLOSE,
                self.max_len
            );
            self.buf.clear();
        }

        frames
    }

    /// Drop any partial frame, e.g. after re-attaching to a source
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

/// Why a completed frame produced no item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    ZeroLength,
    MissingCode,
    MissingData,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::ZeroLength => write!(f, "zero length"),
            DropReason::MissingCode => write!(f, "missing <code>"),
            DropReason::MissingData => write!(f, "missing base64 <data>"),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Capture {
    None,
    Code,
    Length,
    Data,
}

/// Extract `<code>`, `<length>` and `<data encoding="base64">` from a frame.
///
/// The first occurrence of each element wins; other tags are ignored. A missing
/// or non-numeric length counts as zero.
pub fn decode_frame(frame: &str) -> Result<MetadataItem, DropReason> {
    let mut code: Option<String> = None;
    let mut length: Option<String> = None;
    let mut data: Option<String> = None;
    let mut capture = Capture::None;

    for token in Tokenizer::new(frame) {
        match &token {
            Token::Open { name, .. } => {
                capture = match *name {
                    "code" if code.is_none() => Capture::Code,
                    "length" if length.is_none() => Capture::Length,
                    "data" if data.is_none() && token.attr("encoding") == Some("base64") => {
                        Capture::Data
                    }
                    _ => Capture::None,
                };
                let slot = match capture {
                    Capture::Code => &mut code,
                    Capture::Length => &mut length,
                    Capture::Data => &mut data,
                    Capture::None => continue,
                };
                *slot = Some(String::new());
            }
            Token::Close { .. } => capture = Capture::None,
            Token::Text(text) => {
                let slot = match capture {
                    Capture::Code => &mut code,
                    Capture::Length => &mut length,
                    Capture::Data => &mut data,
                    Capture::None => continue,
                };
                if let Some(value) = slot {
                    value.push_str(text);
                }
            }
        }
    }

    let length = length
        .and_then(|l| l.trim().parse::<u64>().ok())
        .unwrap_or(0);
    if length == 0 {
        return Err(DropReason::ZeroLength);
    }

    let code = code.ok_or(DropReason::MissingCode)?;
    let payload_base64 = data.ok_or(DropReason::MissingData)?;

    Ok(MetadataItem {
        code: code.trim().to_string(),
        length,
        payload_base64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE_FRAME: &str = concat!(
        "<item><type>636f7265</type><code>6d696e6d</code><length>5</length>",
        "<data encoding=\"base64\">SGVsbG8=</data></item>"
    );

    #[test]
    fn assembles_frame_across_lines() {
        let mut assembler = FrameAssembler::default();
        assert!(assembler.push_line("<item><type>636f7265</type><code>6d696e6d</code>\n").is_empty());
        assert!(assembler.push_line("  <length>5</length>\n").is_empty());
        assert!(assembler.push_line("<data encoding=\"base64\">\n").is_empty());
        let frames = assembler.push_line("SGVsbG8=</data></item>\n");

        assert_eq!(frames, vec![TITLE_FRAME.to_string()]);
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn delimiter_split_across_lines_is_found() {
        let mut assembler = FrameAssembler::default();
        assert!(assembler.push_line("<item><code>x</code></it").is_empty());
        let frames = assembler.push_line("em>");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn multiple_frames_on_one_line_are_all_emitted() {
        let mut assembler = FrameAssembler::default();
        let line = format!("{TITLE_FRAME}{TITLE_FRAME}<item><code>");
        let frames = assembler.push_line(&line);

        assert_eq!(frames.len(), 2);
        assert_eq!(assembler.buffered_len(), "<item><code>".len());
    }

    #[test]
    fn buffer_is_reset_even_for_garbage_frames() {
        let mut assembler = FrameAssembler::default();
        let frames = assembler.push_line("garbage</item>");
        assert_eq!(frames, vec!["garbage</item>".to_string()]);
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn oversized_buffer_is_discarded() {
        let mut assembler = FrameAssembler::new(16);
        assembler.push_line("<item><data>aaaaaaaaaaaaaaaaaaaa");
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn decodes_well_formed_frame() {
        let item = decode_frame(TITLE_FRAME).unwrap();
        assert_eq!(item.code, "6d696e6d");
        assert_eq!(item.length, 5);
        assert_eq!(item.payload_base64, "SGVsbG8=");
    }

    #[test]
    fn zero_length_is_dropped() {
        let frame = "<item><code>6173616c</code><length>0</length></item>";
        assert_eq!(decode_frame(frame), Err(DropReason::ZeroLength));
    }

    #[test]
    fn missing_length_counts_as_zero() {
        let frame = "<item><code>6173616c</code><data encoding=\"base64\">QQ==</data></item>";
        assert_eq!(decode_frame(frame), Err(DropReason::ZeroLength));
    }

    #[test]
    fn missing_code_is_dropped() {
        let frame = "<item><length>1</length><data encoding=\"base64\">QQ==</data></item>";
        assert_eq!(decode_frame(frame), Err(DropReason::MissingCode));
    }

    #[test]
    fn data_without_base64_marker_is_dropped() {
        let frame = "<item><code>6173616c</code><length>1</length><data>QQ==</data></item>";
        assert_eq!(decode_frame(frame), Err(DropReason::MissingData));
    }

    #[test]
    fn empty_data_element_still_yields_item() {
        let frame = "<item><code>6173616c</code><length>1</length><data encoding=\"base64\"></data></item>";
        let item = decode_frame(frame).unwrap();
        assert_eq!(item.payload_base64, "");
    }

    #[test]
    fn first_occurrence_wins() {
        let frame = concat!(
            "<item><code>6d696e6d</code><code>6173616c</code><length>3</length>",
            "<data encoding=\"base64\">QUJD</data></item>"
        );
        assert_eq!(decode_frame(frame).unwrap().code, "6d696e6d");
    }
}
