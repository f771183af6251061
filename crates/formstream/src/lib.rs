//! Incremental decoding of HTML form request bodies.
//!
//! formstream turns `multipart/form-data` and
//! `application/x-www-form-urlencoded` bodies, fed in whatever chunks the
//! transport delivers, into field values and streamed file uploads:
//!
//! - **Streaming**: file content flows through a [`FileStream`] as it arrives
//! - **Backpressure**: a slow file consumer pauses the decoder instead of buffering
//! - **Bounded**: per-field, per-file and per-body limits truncate rather than fail
//! - **Charset aware**: part charsets and RFC 5987 extended parameters
//!
//! # Quick Start
//!
//! ```
//! use formstream::prelude::*;
//!
//! let body = b"--boundary\r\n\
//!     Content-Disposition: form-data; name=\"user\"\r\n\r\n\
//!     ada\r\n\
//!     --boundary\r\n\
//!     Content-Disposition: form-data; name=\"avatar\"; filename=\"ada.png\"\r\n\
//!     Content-Type: image/png\r\n\r\n\
//!     PNGDATA\r\n\
//!     --boundary--\r\n";
//!
//! let form = decode_all(
//!     "multipart/form-data; boundary=boundary",
//!     FormConfig::default().limits(Limits::default().file_size(1024)),
//!     body.chunks(16),
//! )
//! .unwrap();
//!
//! assert_eq!(form.get_field("user"), Some("ada"));
//! assert_eq!(form.get_file("avatar").unwrap().mime_type, "image/png");
//! ```
//!
//! # Crate Structure
//!
//! - [`formstream_core`]: Decoders, events, configuration, file streams
//! - [`formstream_http`]: Boundary search, part headers, parameters, charsets

#![forbid(unsafe_code)]

// Re-export crates
pub use formstream_core as core;
pub use formstream_http as http;

// Re-export commonly used types
pub use formstream_core::{
    BodyKind, CollectedField, CollectedForm, Completion, FieldInfo, FileInfo, FileRead,
    FileStream, FormCollector, FormConfig, FormDecoder, FormError, FormHandler, LimitKind, Limits,
    UploadedFile, WriteStatus, decode_all,
};
pub use formstream_http::parse_content_type;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Completion, FieldInfo, FileInfo, FileRead, FileStream, FormConfig, FormDecoder, FormError,
        FormHandler, LimitKind, Limits, WriteStatus, decode_all,
    };
}
