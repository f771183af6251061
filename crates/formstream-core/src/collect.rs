//! In-memory collection of a whole form.
//!
//! [`FormCollector`] is a ready-made [`FormHandler`] that keeps every field
//! and reads every file stream into memory. [`decode_all`] drives a
//! [`FormDecoder`] over a sequence of chunks with it, pumping file streams
//! whenever the decoder blocks.
//!
//! # Example
//!
//! ```
//! use formstream_core::{FormConfig, decode_all};
//!
//! let body = b"--b\r\n\
//!     Content-Disposition: form-data; name=\"title\"\r\n\r\n\
//!     Report\r\n\
//!     --b\r\n\
//!     Content-Disposition: form-data; name=\"doc\"; filename=\"r.txt\"\r\n\r\n\
//!     contents\r\n\
//!     --b--\r\n";
//!
//! let form = decode_all(
//!     "multipart/form-data; boundary=b",
//!     FormConfig::default(),
//!     body.chunks(7),
//! )
//! .unwrap();
//!
//! assert_eq!(form.get_field("title"), Some("Report"));
//! let doc = form.get_file("doc").unwrap();
//! assert_eq!(doc.filename.as_deref(), Some("r.txt"));
//! assert_eq!(doc.data, b"contents");
//! ```

use crate::config::FormConfig;
use crate::decoder::{Completion, FormDecoder, WriteStatus};
use crate::error::FormError;
use crate::event::{FieldInfo, FileInfo, FormHandler, LimitKind};
use crate::file_stream::{FileRead, FileStream};

/// A decoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedField {
    /// Field name; `None` for a multipart part without one.
    pub name: Option<String>,
    /// Decoded value.
    pub value: String,
    /// Metadata reported with the value.
    pub info: FieldInfo,
}

/// A file read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Field name; `None` for a multipart part without one.
    pub name: Option<String>,
    /// Filename from the part's disposition.
    pub filename: Option<String>,
    /// Transfer encoding of the part.
    pub encoding: String,
    /// Media type essence of the part.
    pub mime_type: String,
    /// File content, cut to the `file_size` limit.
    pub data: Vec<u8>,
    /// True if content was cut by the `file_size` limit.
    pub truncated: bool,
}

impl UploadedFile {
    /// Size of the kept content in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Content as UTF-8 text, if it is valid.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

#[derive(Debug)]
struct Incoming {
    name: Option<String>,
    info: FileInfo,
    stream: FileStream,
    data: Vec<u8>,
}

impl Incoming {
    fn into_upload(self) -> UploadedFile {
        let truncated = self.stream.truncated();
        UploadedFile {
            name: self.name,
            filename: self.info.filename,
            encoding: self.info.encoding,
            mime_type: self.info.mime_type,
            data: self.data,
            truncated,
        }
    }
}

/// Handler that buffers the whole form in memory.
#[derive(Debug, Default)]
pub struct FormCollector {
    fields: Vec<CollectedField>,
    files: Vec<UploadedFile>,
    incoming: Vec<Incoming>,
    limits_hit: Vec<LimitKind>,
    closed: bool,
}

impl FormCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read whatever the open file streams have buffered.
    ///
    /// Streams that have ended move to the finished file list.
    ///
    /// # Errors
    ///
    /// Returns the error a file stream failed with.
    pub fn pump(&mut self) -> Result<(), FormError> {
        let mut i = 0;
        while i < self.incoming.len() {
            let file = &mut self.incoming[i];
            let ended = loop {
                match file.stream.try_read() {
                    FileRead::Chunk(chunk) => file.data.extend_from_slice(&chunk),
                    FileRead::Limit => {}
                    FileRead::Pending => break false,
                    FileRead::End => break true,
                    FileRead::Failed(err) => return Err(err),
                }
            };
            if ended {
                let file = self.incoming.remove(i);
                self.files.push(file.into_upload());
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// True once the decoder reported completion.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Consume the collector. Streams still open are dropped.
    #[must_use]
    pub fn into_form(self) -> CollectedForm {
        CollectedForm {
            fields: self.fields,
            files: self.files,
            limits_hit: self.limits_hit,
        }
    }
}

impl FormHandler for FormCollector {
    fn on_field(&mut self, name: Option<String>, value: String, info: FieldInfo) {
        self.fields.push(CollectedField { name, value, info });
    }

    fn on_file(&mut self, name: Option<String>, stream: FileStream, info: FileInfo) {
        self.incoming.push(Incoming {
            name,
            info,
            stream,
            data: Vec::new(),
        });
    }

    fn on_limit(&mut self, kind: LimitKind) {
        self.limits_hit.push(kind);
    }

    fn on_close(&mut self) {
        self.closed = true;
    }
}

/// A fully decoded form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedForm {
    fields: Vec<CollectedField>,
    files: Vec<UploadedFile>,
    limits_hit: Vec<LimitKind>,
}

impl CollectedForm {
    /// All fields as `(name, value)` pairs, in body order. A missing name
    /// reads as the empty string.
    #[must_use]
    pub fn fields(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_deref().unwrap_or(""), f.value.as_str()))
            .collect()
    }

    /// All fields with their metadata.
    #[must_use]
    pub fn field_entries(&self) -> &[CollectedField] {
        &self.fields
    }

    /// First value for `name`.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.get_field_entry(name).map(|f| f.value.as_str())
    }

    /// First field entry for `name`.
    #[must_use]
    pub fn get_field_entry(&self, name: &str) -> Option<&CollectedField> {
        self.fields.iter().find(|f| f.name.as_deref() == Some(name))
    }

    /// Every value for `name`.
    #[must_use]
    pub fn get_fields(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name.as_deref() == Some(name))
            .map(|f| f.value.as_str())
            .collect()
    }

    /// All files, in body order.
    #[must_use]
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// First file for `name`.
    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.name.as_deref() == Some(name))
    }

    /// Consume the form and return its files.
    #[must_use]
    pub fn into_files(self) -> Vec<UploadedFile> {
        self.files
    }

    /// Limits reached while decoding, in the order they fired.
    #[must_use]
    pub fn limits_hit(&self) -> &[LimitKind] {
        &self.limits_hit
    }

    /// Check if a field or file with `name` exists.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field_entry(name).is_some() || self.get_file(name).is_some()
    }

    /// Number of fields plus files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len() + self.files.len()
    }

    /// True if the form has neither fields nor files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a whole body held as a sequence of chunks.
///
/// # Errors
///
/// Returns any configuration or malformed-input error the decoder raises.
pub fn decode_all<I>(
    content_type: &str,
    config: FormConfig,
    chunks: I,
) -> Result<CollectedForm, FormError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut decoder = FormDecoder::new(content_type, config, FormCollector::new())?;
    for chunk in chunks {
        let mut status = decoder.write(chunk.as_ref())?;
        while status == WriteStatus::Blocked {
            decoder.handler_mut().pump()?;
            status = decoder.resume()?;
        }
    }
    while decoder.end()? == Completion::Pending {
        decoder.handler_mut().pump()?;
    }
    Ok(decoder.into_handler().into_form())
}
