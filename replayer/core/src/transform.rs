//! Line Transform
//!
//! Turns one recorded line into the bytes that go on the wire.
//!
//! # Steps
//!
//! ```text
//! raw line ──► strip `$...$` spans ──► strip newlines ──► encode ──► payload
//!              (optional)              (optional)         text | hex
//! ```
//!
//! Recordings annotate lines with inline spans between two `$` markers
//! (timestamps, capture notes). Those spans are never part of the payload.

use std::borrow::Cow;

use crate::error::Result;

/// Delimiter of inline annotation spans
pub const MARKER: char = '$';

/// How a stripped line becomes bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// UTF-8 bytes of the line
    #[default]
    Text,
    /// The line is a hex string; send the decoded bytes
    Hex,
}

/// Per-line transformation applied before each send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineTransform {
    /// Remove `$...$` spans
    pub strip_markers: bool,
    /// Remove newline characters
    pub strip_newline: bool,
    /// Output encoding
    pub encoding: PayloadEncoding,
}

impl Default for LineTransform {
    fn default() -> Self {
        Self {
            strip_markers: true,
            strip_newline: false,
            encoding: PayloadEncoding::Text,
        }
    }
}

impl LineTransform {
    /// Build a transform with markers stripped and the given flags
    #[must_use]
    pub fn new(strip_newline: bool, encoding: PayloadEncoding) -> Self {
        Self {
            strip_newline,
            encoding,
            ..Default::default()
        }
    }

    /// Apply only the textual steps (markers, newlines)
    #[must_use]
    pub fn strip<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut text = if self.strip_markers {
            strip_inline_markers(line)
        } else {
            Cow::Borrowed(line)
        };

        if self.strip_newline && text.contains(['\n', '\r']) {
            text.to_mut().retain(|c| c != '\n' && c != '\r');
        }

        text
    }

    /// Produce the wire payload for one line
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Encoding`](crate::ReplayError::Encoding) in hex
    /// mode when the stripped line is not an even-length hex string.
    pub fn apply(&self, line: &str) -> Result<Vec<u8>> {
        let text = self.strip(line);

        match self.encoding {
            PayloadEncoding::Text => Ok(text.into_owned().into_bytes()),
            PayloadEncoding::Hex => decode_hex(&text),
        }
    }
}

/// Remove every `$...$` span, delimiters included
///
/// Matching is non-greedy and left to right. A span ends at the next `$` on
/// the same line; a `$` with no partner before the next newline is kept.
#[must_use]
pub fn strip_inline_markers(line: &str) -> Cow<'_, str> {
    if !line.contains(MARKER) {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find(MARKER) {
        let after = &rest[start + MARKER.len_utf8()..];

        match after.find([MARKER, '\n']) {
            Some(end) if after[end..].starts_with(MARKER) => {
                out.push_str(&rest[..start]);
                rest = &after[end + MARKER.len_utf8()..];
            }
            _ => {
                // Unpaired marker, keep it and scan on
                out.push_str(&rest[..start + MARKER.len_utf8()]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode a hex string, ignoring ASCII whitespace between digits
fn decode_hex(text: &str) -> Result<Vec<u8>> {
    if text.contains(|c: char| c.is_ascii_whitespace()) {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(hex::decode(compact)?)
    } else {
        Ok(hex::decode(text)?)
    }
}
