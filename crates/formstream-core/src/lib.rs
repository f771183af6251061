//! Streaming decoders for HTML form bodies.
//!
//! This crate turns a `multipart/form-data` or
//! `application/x-www-form-urlencoded` request body, fed in arbitrary
//! chunks, into a sequence of events:
//! - fields, delivered whole as decoded text
//! - files, delivered as a [`FileStream`] with backpressure
//! - limit notices, when a configured count is reached
//! - a single close event once everything is consumed
//!
//! # Design Principles
//!
//! - One pass over the input, never re-scanned
//! - Memory bounded by configured limits and the file high-water mark
//! - Results independent of how the body is split into chunks
//! - A single error channel: every fallible call returns [`FormError`]
//!
//! # Example
//!
//! ```
//! use formstream_core::{Completion, FileInfo, FileRead, FileStream, FormConfig, FormDecoder,
//!     FormHandler};
//!
//! #[derive(Default)]
//! struct Uploads(Vec<FileStream>);
//!
//! impl FormHandler for Uploads {
//!     fn on_file(&mut self, _name: Option<String>, stream: FileStream, _info: FileInfo) {
//!         self.0.push(stream);
//!     }
//! }
//!
//! let mut decoder = FormDecoder::new(
//!     "multipart/form-data; boundary=sep",
//!     FormConfig::default(),
//!     Uploads::default(),
//! )
//! .unwrap();
//! decoder
//!     .write(b"--sep\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a\"\r\n\r\n")
//!     .unwrap();
//! decoder.write(b"file body\r\n--sep--").unwrap();
//!
//! // Completion waits until the stream has been read to its end.
//! assert_eq!(decoder.end().unwrap(), Completion::Pending);
//! let mut stream = decoder.handler_mut().0.pop().unwrap();
//! assert_eq!(stream.try_read(), FileRead::Chunk(b"file body".to_vec()));
//! assert_eq!(stream.try_read(), FileRead::End);
//! assert_eq!(decoder.end().unwrap(), Completion::Finished);
//! ```

#![forbid(unsafe_code)]

mod collect;
pub mod config;
mod decoder;
pub mod error;
pub mod event;
mod file_stream;
mod multipart;
mod urlencoded;

pub use collect::{CollectedField, CollectedForm, FormCollector, UploadedFile, decode_all};
pub use config::{
    DEFAULT_CHARSET, DEFAULT_FIELD_NAME_SIZE, DEFAULT_FIELD_SIZE, DEFAULT_FILE_HIGH_WATER_MARK,
    DEFAULT_PARAM_CHARSET, FormConfig, Limits,
};
pub use decoder::{BodyKind, Completion, FormDecoder, WriteStatus};
pub use error::FormError;
pub use event::{FieldInfo, FileInfo, FormHandler, LimitKind};
pub use file_stream::{FileRead, FileStream};
