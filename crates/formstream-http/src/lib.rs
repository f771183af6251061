//! Wire-level primitives for decoding HTML form bodies.
//!
//! This crate holds the pieces of a form body decoder that know nothing about
//! events or backpressure. Everything here is synchronous, works on byte
//! slices, and can be fed input split at arbitrary points.
//!
//! # Features
//!
//! - Incremental MIME part header parsing with size and pair limits
//! - `Content-Type` / `Content-Disposition` parameter parsing, including
//!   RFC 5987 extended values
//! - Charset decoder lookup backed by `encoding_rs`
//! - Streaming needle search for multipart boundaries
//! - Hex digit lookup for percent escapes
//!
//! # Example
//!
//! ```
//! use formstream_http::{Decoder, parse_content_type, parse_disposition};
//!
//! let ct = parse_content_type("multipart/form-data; boundary=XYZ").unwrap();
//! assert_eq!(ct.param("boundary"), Some("XYZ"));
//!
//! let disp = parse_disposition("form-data; name=\"a\"", Decoder::Latin1).unwrap();
//! assert_eq!(disp.name(), Some("a"));
//! ```

#![deny(unsafe_code)]

mod chars;
pub mod charset;
pub mod header;
pub mod params;
pub mod percent;
pub mod search;

pub use charset::{Decoder, EncodeHint, latin1_decode, latin1_encode};
pub use header::{
    HeaderError, HeaderParser, HeaderStatus, MAX_HEADER_PAIRS, MAX_HEADER_SIZE, PartHeaders,
};
pub use params::{ContentType, Disposition, parse_content_type, parse_disposition};
pub use percent::hex_value;
pub use search::{Scan, StreamSearch};
