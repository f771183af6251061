//! Events delivered to the caller.
//!
//! A decoder owns one [`FormHandler`] and calls it in the order parts appear
//! in the body. Every method has a no-op default, so a handler only
//! implements what it cares about.

use crate::file_stream::FileStream;

/// Which count limit was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// The `parts` limit (multipart only).
    Parts,
    /// The `files` limit (multipart only).
    Files,
    /// The `fields` limit.
    Fields,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parts => write!(f, "parts"),
            Self::Files => write!(f, "files"),
            Self::Fields => write!(f, "fields"),
        }
    }
}

/// Metadata accompanying a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// The name was cut to `field_name_size` bytes.
    pub name_truncated: bool,
    /// The value was cut to `field_size` bytes.
    pub value_truncated: bool,
    /// Transfer encoding for multipart, charset for urlencoded.
    pub encoding: String,
    /// Media type essence, `text/plain` unless the part said otherwise.
    pub mime_type: String,
}

/// Metadata accompanying a file stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// The filename parameter, basename-stripped unless paths are preserved.
    pub filename: Option<String>,
    /// The part's `Content-Transfer-Encoding`, `7bit` by default.
    pub encoding: String,
    /// Media type essence of the part.
    pub mime_type: String,
}

/// Receives the decoded contents of a form body.
///
/// `name` is `None` only for a multipart part whose disposition carried no
/// `name` parameter.
pub trait FormHandler {
    /// A complete field value.
    fn on_field(&mut self, name: Option<String>, value: String, info: FieldInfo) {
        let _ = (name, value, info);
    }

    /// A file part. Its bytes arrive through `stream`, which must be drained
    /// or dropped for the decoder to make progress.
    fn on_file(&mut self, name: Option<String>, stream: FileStream, info: FileInfo) {
        let _ = (name, stream, info);
    }

    /// A count limit was reached. Fires at most once per kind.
    fn on_limit(&mut self, kind: LimitKind) {
        let _ = kind;
    }

    /// The body is fully decoded and every file stream has finished.
    /// Fires at most once, and never after an error.
    fn on_close(&mut self) {}

    /// Whether field events are wanted. When false, field parts are skipped
    /// without decoding (they still count toward the `fields` limit).
    fn accepts_fields(&self) -> bool {
        true
    }

    /// Whether file events are wanted. When false, file parts are skipped
    /// without creating a stream (they still count toward the `files` limit).
    fn accepts_files(&self) -> bool {
        true
    }
}

impl<H: FormHandler + ?Sized> FormHandler for Box<H> {
    fn on_field(&mut self, name: Option<String>, value: String, info: FieldInfo) {
        (**self).on_field(name, value, info);
    }

    fn on_file(&mut self, name: Option<String>, stream: FileStream, info: FileInfo) {
        (**self).on_file(name, stream, info);
    }

    fn on_limit(&mut self, kind: LimitKind) {
        (**self).on_limit(kind);
    }

    fn on_close(&mut self) {
        (**self).on_close();
    }

    fn accepts_fields(&self) -> bool {
        (**self).accepts_fields()
    }

    fn accepts_files(&self) -> bool {
        (**self).accepts_files()
    }
}
