//! Incremental parser for a MIME part's header block.
//!
//! The parser is fed arbitrary slices of the part stream and keeps its
//! position across calls, so a header line may be split anywhere. It stops
//! at the blank line that ends the block and reports how many bytes of the
//! final slice it used; the rest belongs to the part body.
//!
//! ```text
//! NAME --':'--> PRE_VALUE --non-WSP--> VALUE
//!                                        |  CR LF WSP  -> fold, stay in VALUE
//!                                        |  CR LF tchar -> commit pair, NAME
//!                                        |  CR LF CR LF -> complete
//! ```
//!
//! # Example
//!
//! ```
//! use formstream_http::{HeaderParser, HeaderStatus};
//!
//! let mut parser = HeaderParser::new();
//! assert!(matches!(parser.push(b"Content-Type: text/pl").unwrap(), HeaderStatus::Partial));
//! match parser.push(b"ain\r\n\r\nbody").unwrap() {
//!     HeaderStatus::Complete { consumed, headers } => {
//!         assert_eq!(consumed, 7);
//!         assert_eq!(headers.get("content-type"), Some(&b"text/plain"[..]));
//!     }
//!     HeaderStatus::Partial => unreachable!(),
//! }
//! ```

use std::collections::HashMap;

use crate::chars::{is_field_vchar, is_token, lower_token};
use crate::charset::latin1_decode;

/// Maximum number of header pairs recorded per part.
///
/// Pairs past this count are parsed but silently dropped.
pub const MAX_HEADER_PAIRS: usize = 2000;

/// Maximum size of one part's header block in bytes.
///
/// Exceeding it is a fatal parse error.
pub const MAX_HEADER_SIZE: usize = 16 * 1024;

/// Errors raised while parsing a header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// A byte not allowed at this position.
    InvalidByte {
        /// The offending byte.
        byte: u8,
    },
    /// A `:` with no header name before it.
    EmptyName,
    /// The header block exceeded [`MAX_HEADER_SIZE`].
    TooLarge,
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidByte { byte } => write!(f, "invalid byte 0x{byte:02x} in part header"),
            Self::EmptyName => write!(f, "empty part header name"),
            Self::TooLarge => write!(
                f,
                "part header block exceeds limit of {MAX_HEADER_SIZE} bytes"
            ),
        }
    }
}

impl std::error::Error for HeaderError {}

/// Multi-valued header map for one part.
///
/// Names are lower-cased. Values are the raw header bytes; a repeated
/// header name appends rather than overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    map: HashMap<String, Vec<Vec<u8>>>,
}

impl PartHeaders {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name` (lower-cased).
    pub fn append(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.map
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value for a header name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.values(name).first().map(Vec::as_slice)
    }

    /// First value for a header name, read as Latin-1 text.
    #[must_use]
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name).map(latin1_decode)
    }

    /// All values for a header name, in arrival order.
    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &[u8]> {
        self.values(name).iter().map(Vec::as_slice)
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no header was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn values(&self, name: &str) -> &[Vec<u8>] {
        let found = if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.map.get(&name.to_ascii_lowercase())
        } else {
            self.map.get(name)
        };
        match found {
            Some(values) => values.as_slice(),
            None => &[],
        }
    }
}

/// Outcome of feeding bytes to a [`HeaderParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderStatus {
    /// All input was consumed; the block is not finished yet.
    Partial,
    /// The block ended after `consumed` bytes of the last input.
    Complete {
        /// Bytes of the last input that belonged to the header block.
        consumed: usize,
        /// The finished header map.
        headers: PartHeaders,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    PreValue,
    Value(LineEnd),
}

/// Progress through the CR LF [CR LF] that follows a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnd {
    None,
    Cr,
    CrLf,
    CrLfCr,
}

/// Incremental header block parser.
#[derive(Debug)]
pub struct HeaderParser {
    state: State,
    name: Vec<u8>,
    value: Vec<u8>,
    headers: PartHeaders,
    pairs: usize,
    bytes: usize,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParser {
    /// Create a parser positioned at the start of a header block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Name,
            name: Vec::new(),
            value: Vec::new(),
            headers: PartHeaders::new(),
            pairs: 0,
            bytes: 0,
        }
    }

    /// Discard all progress and start a fresh block.
    pub fn reset(&mut self) {
        self.state = State::Name;
        self.name.clear();
        self.value.clear();
        self.headers = PartHeaders::new();
        self.pairs = 0;
        self.bytes = 0;
    }

    /// Bytes of the current block consumed so far.
    #[must_use]
    pub fn bytes_seen(&self) -> usize {
        self.bytes
    }

    /// Feed the next slice of the header block.
    ///
    /// On [`HeaderStatus::Complete`] the parser has already reset itself and
    /// can be reused for the next part. After an error the parser must be
    /// [`reset`](Self::reset) before reuse.
    pub fn push(&mut self, data: &[u8]) -> Result<HeaderStatus, HeaderError> {
        let mut pos = 0;
        while pos < data.len() {
            let b = data[pos];
            match self.state {
                State::Name => {
                    if is_token(b) {
                        self.name.push(b);
                    } else if b == b':' {
                        if self.name.is_empty() {
                            return Err(HeaderError::EmptyName);
                        }
                        self.state = State::PreValue;
                    } else if b == b'\r' && self.name.is_empty() {
                        // blank line with no pending header: only legal at block start
                        self.state = State::Value(LineEnd::CrLfCr);
                    } else {
                        return Err(HeaderError::InvalidByte { byte: b });
                    }
                }
                State::PreValue => {
                    if b != b' ' && b != b'\t' {
                        self.state = State::Value(LineEnd::None);
                        continue;
                    }
                }
                State::Value(LineEnd::None) => {
                    if is_field_vchar(b) {
                        self.value.push(b);
                    } else if b == b'\r' {
                        self.state = State::Value(LineEnd::Cr);
                    } else {
                        return Err(HeaderError::InvalidByte { byte: b });
                    }
                }
                State::Value(LineEnd::Cr) => {
                    if b != b'\n' {
                        return Err(HeaderError::InvalidByte { byte: b });
                    }
                    self.state = State::Value(LineEnd::CrLf);
                }
                State::Value(LineEnd::CrLf) => {
                    if b == b' ' || b == b'\t' {
                        // folded continuation of the previous value
                        self.value.push(b);
                        self.state = State::Value(LineEnd::None);
                    } else {
                        self.commit();
                        if b == b'\r' {
                            self.state = State::Value(LineEnd::CrLfCr);
                        } else {
                            self.state = State::Name;
                            continue;
                        }
                    }
                }
                State::Value(LineEnd::CrLfCr) => {
                    if b != b'\n' {
                        return Err(HeaderError::InvalidByte { byte: b });
                    }
                    self.count()?;
                    let headers = std::mem::take(&mut self.headers);
                    self.reset();
                    return Ok(HeaderStatus::Complete {
                        consumed: pos + 1,
                        headers,
                    });
                }
            }
            self.count()?;
            pos += 1;
        }
        Ok(HeaderStatus::Partial)
    }

    fn count(&mut self) -> Result<(), HeaderError> {
        if self.bytes == MAX_HEADER_SIZE {
            return Err(HeaderError::TooLarge);
        }
        self.bytes += 1;
        Ok(())
    }

    fn commit(&mut self) {
        if self.pairs < MAX_HEADER_PAIRS {
            let name = lower_token(&self.name);
            self.headers
                .map
                .entry(name)
                .or_default()
                .push(std::mem::take(&mut self.value));
        }
        self.pairs += 1;
        self.name.clear();
        self.value.clear();
    }
}
