//! Charset decoder registry.
//!
//! Maps a charset label to a [`Decoder`]. The common web charsets are handled
//! directly; everything else is resolved through `encoding_rs` labels. A label
//! that names no known encoding yields [`Decoder::Unsupported`], whose
//! [`decode`](Decoder::decode) always returns `None` so the caller can drop the
//! value without failing the whole body.
//!
//! # Example
//!
//! ```
//! use formstream_http::{Decoder, EncodeHint};
//!
//! let utf8 = Decoder::for_charset("UTF-8");
//! assert_eq!(utf8.decode(b"caf\xc3\xa9", EncodeHint::PercentHigh).as_deref(), Some("café"));
//!
//! let latin1 = Decoder::for_charset("iso-8859-1");
//! assert_eq!(latin1.decode(b"caf\xe9", EncodeHint::Ascii).as_deref(), Some("café"));
//! ```

use base64::Engine;
use encoding_rs::Encoding;

/// What is known about the bytes handed to a decoder.
///
/// Produced while percent-decoding. It only lets the decoder skip work;
/// decoding the same bytes under any hint gives the same string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum EncodeHint {
    /// No percent escapes were seen.
    #[default]
    Ascii,
    /// Percent escapes were seen, all of them below 0x80.
    PercentAscii,
    /// At least one percent escape produced a byte >= 0x80.
    PercentHigh,
}

impl EncodeHint {
    /// Folds a decoded escape byte into the hint.
    #[must_use]
    pub fn with_escape(self, byte: u8) -> Self {
        if byte >= 0x80 {
            Self::PercentHigh
        } else {
            self.max(Self::PercentAscii)
        }
    }
}

/// A charset decoder turning raw bytes into a `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// UTF-8, lossy on invalid sequences.
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    /// UTF-16 little endian.
    Utf16Le,
    /// Renders the bytes as standard base64 text.
    Base64,
    /// Any other encoding known to `encoding_rs`.
    Other(&'static Encoding),
    /// The label named no known encoding.
    Unsupported,
}

impl Decoder {
    /// Looks up the decoder for a charset label.
    ///
    /// Labels are matched case-insensitively.
    #[must_use]
    pub fn for_charset(label: &str) -> Self {
        if let Some(decoder) = Self::builtin(label) {
            return decoder;
        }
        let lower = label.trim().to_ascii_lowercase();
        if let Some(decoder) = Self::builtin(&lower) {
            return decoder;
        }
        Encoding::for_label(lower.as_bytes()).map_or(Self::Unsupported, Self::Other)
    }

    fn builtin(label: &str) -> Option<Self> {
        Some(match label {
            "utf-8" | "utf8" => Self::Utf8,
            "latin1" | "ascii" | "us-ascii" | "iso-8859-1" | "iso8859-1" | "iso88591"
            | "iso_8859-1" | "windows-1252" | "iso_8859-1:1987" | "cp1252" | "x-cp1252" => {
                Self::Latin1
            }
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Self::Utf16Le,
            "base64" => Self::Base64,
            _ => return None,
        })
    }

    /// Returns true if this decoder can produce a value at all.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Decodes `data` into a string.
    ///
    /// Returns `None` only for [`Decoder::Unsupported`].
    #[must_use]
    pub fn decode(&self, data: &[u8], hint: EncodeHint) -> Option<String> {
        if let Self::Unsupported = self {
            return None;
        }
        if data.is_empty() {
            return Some(String::new());
        }
        let text = match self {
            Self::Utf8 => {
                if hint != EncodeHint::PercentHigh && data.is_ascii() {
                    latin1_decode(data)
                } else {
                    String::from_utf8_lossy(data).into_owned()
                }
            }
            Self::Latin1 => latin1_decode(data),
            Self::Utf16Le => encoding_rs::UTF_16LE
                .decode_without_bom_handling(data)
                .0
                .into_owned(),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(data),
            Self::Other(encoding) => encoding.decode_with_bom_removal(data).0.into_owned(),
            Self::Unsupported => return None,
        };
        Some(text)
    }
}

/// Maps each byte to the code point of the same value.
#[must_use]
pub fn latin1_decode(data: &[u8]) -> String {
    data.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`latin1_decode`].
///
/// Returns `None` if the string holds a code point above U+00FF.
#[must_use]
pub fn latin1_encode(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}
