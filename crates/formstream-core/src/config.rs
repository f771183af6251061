//! Decoder configuration.
//!
//! [`FormConfig`] carries the limits and charset defaults for one body.
//! Both it and [`Limits`] deserialize from any serde format with every key
//! optional, so they can live in an application config file:
//!
//! ```
//! use formstream_core::FormConfig;
//!
//! let config: FormConfig = serde_json::from_str(
//!     r#"{ "limits": { "files": 2, "file_size": 1048576 }, "preserve_path": true }"#,
//! )
//! .unwrap();
//! assert_eq!(config.get_limits().get_files(), 2);
//! assert_eq!(config.get_limits().get_field_size(), 1024 * 1024);
//! assert!(config.get_preserve_path());
//! ```

use serde::Deserialize;

/// Default maximum field name length in bytes.
pub const DEFAULT_FIELD_NAME_SIZE: usize = 100;

/// Default maximum field value length in bytes (1MB).
pub const DEFAULT_FIELD_SIZE: usize = 1024 * 1024;

/// Default charset for field values.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Default charset for header parameter values.
pub const DEFAULT_PARAM_CHARSET: &str = "latin1";

/// Default buffered bytes at which a file stream reports backpressure (64KB).
pub const DEFAULT_FILE_HIGH_WATER_MARK: usize = 64 * 1024;

/// Size and count limits for one body.
///
/// Breaching a limit never fails the decode: the value is truncated or the
/// part skipped, and the handler hears about it once.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum field name length in bytes (urlencoded only).
    field_name_size: usize,
    /// Maximum field value length in bytes.
    field_size: usize,
    /// Maximum number of fields.
    fields: usize,
    /// Maximum file size in bytes.
    file_size: usize,
    /// Maximum number of files.
    files: usize,
    /// Maximum number of parts (multipart only).
    parts: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            field_name_size: DEFAULT_FIELD_NAME_SIZE,
            field_size: DEFAULT_FIELD_SIZE,
            fields: usize::MAX,
            file_size: usize::MAX,
            files: usize::MAX,
            parts: usize::MAX,
        }
    }
}

impl Limits {
    /// Create limits with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum field name length.
    #[must_use]
    pub fn field_name_size(mut self, size: usize) -> Self {
        self.field_name_size = size;
        self
    }

    /// Set the maximum field value length.
    #[must_use]
    pub fn field_size(mut self, size: usize) -> Self {
        self.field_size = size;
        self
    }

    /// Set the maximum number of fields.
    #[must_use]
    pub fn fields(mut self, count: usize) -> Self {
        self.fields = count;
        self
    }

    /// Set the maximum file size.
    #[must_use]
    pub fn file_size(mut self, size: usize) -> Self {
        self.file_size = size;
        self
    }

    /// Set the maximum number of files.
    #[must_use]
    pub fn files(mut self, count: usize) -> Self {
        self.files = count;
        self
    }

    /// Set the maximum number of parts.
    #[must_use]
    pub fn parts(mut self, count: usize) -> Self {
        self.parts = count;
        self
    }

    /// Get the maximum field name length.
    #[must_use]
    pub fn get_field_name_size(&self) -> usize {
        self.field_name_size
    }

    /// Get the maximum field value length.
    #[must_use]
    pub fn get_field_size(&self) -> usize {
        self.field_size
    }

    /// Get the maximum number of fields.
    #[must_use]
    pub fn get_fields(&self) -> usize {
        self.fields
    }

    /// Get the maximum file size.
    #[must_use]
    pub fn get_file_size(&self) -> usize {
        self.file_size
    }

    /// Get the maximum number of files.
    #[must_use]
    pub fn get_files(&self) -> usize {
        self.files
    }

    /// Get the maximum number of parts.
    #[must_use]
    pub fn get_parts(&self) -> usize {
        self.parts
    }
}

/// Configuration for a form decoder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    limits: Limits,
    /// Charset for field values that name none.
    default_charset: String,
    /// Charset for plain (non-extended) header parameter values.
    default_param_charset: String,
    /// Keep directory components of uploaded filenames.
    preserve_path: bool,
    /// Buffered bytes at which a file stream reports backpressure.
    file_high_water_mark: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            default_charset: DEFAULT_CHARSET.to_string(),
            default_param_charset: DEFAULT_PARAM_CHARSET.to_string(),
            preserve_path: false,
            file_high_water_mark: DEFAULT_FILE_HIGH_WATER_MARK,
        }
    }
}

impl FormConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the limits.
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the default charset for field values.
    #[must_use]
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = charset.into();
        self
    }

    /// Set the default charset for header parameter values.
    #[must_use]
    pub fn default_param_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_param_charset = charset.into();
        self
    }

    /// Keep or strip directory components of uploaded filenames.
    #[must_use]
    pub fn preserve_path(mut self, preserve: bool) -> Self {
        self.preserve_path = preserve;
        self
    }

    /// Set the file stream backpressure threshold.
    ///
    /// Clamped to at least one byte.
    #[must_use]
    pub fn file_high_water_mark(mut self, size: usize) -> Self {
        self.file_high_water_mark = size.max(1);
        self
    }

    /// Get the limits.
    #[must_use]
    pub fn get_limits(&self) -> &Limits {
        &self.limits
    }

    /// Get the default charset for field values.
    #[must_use]
    pub fn get_default_charset(&self) -> &str {
        &self.default_charset
    }

    /// Get the default charset for header parameter values.
    #[must_use]
    pub fn get_default_param_charset(&self) -> &str {
        &self.default_param_charset
    }

    /// Whether directory components of filenames are kept.
    #[must_use]
    pub fn get_preserve_path(&self) -> bool {
        self.preserve_path
    }

    /// Get the file stream backpressure threshold.
    #[must_use]
    pub fn get_file_high_water_mark(&self) -> usize {
        self.file_high_water_mark.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormConfig::default();
        let limits = config.get_limits();
        assert_eq!(limits.get_field_name_size(), 100);
        assert_eq!(limits.get_field_size(), 1024 * 1024);
        assert_eq!(limits.get_fields(), usize::MAX);
        assert_eq!(limits.get_file_size(), usize::MAX);
        assert_eq!(limits.get_files(), usize::MAX);
        assert_eq!(limits.get_parts(), usize::MAX);
        assert_eq!(config.get_default_charset(), "utf-8");
        assert_eq!(config.get_default_param_charset(), "latin1");
        assert!(!config.get_preserve_path());
        assert_eq!(config.get_file_high_water_mark(), 64 * 1024);
    }

    #[test]
    fn test_builder() {
        let config = FormConfig::new()
            .limits(Limits::new().files(1).file_size(10).parts(3))
            .default_charset("latin1")
            .preserve_path(true)
            .file_high_water_mark(0);
        assert_eq!(config.get_limits().get_files(), 1);
        assert_eq!(config.get_limits().get_file_size(), 10);
        assert_eq!(config.get_limits().get_parts(), 3);
        assert_eq!(config.get_default_charset(), "latin1");
        assert!(config.get_preserve_path());
        assert_eq!(config.get_file_high_water_mark(), 1);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FormConfig =
            serde_json::from_str(r#"{ "default_charset": "utf-16le", "limits": { "fields": 5 } }"#)
                .unwrap();
        assert_eq!(config.get_default_charset(), "utf-16le");
        assert_eq!(config.get_default_param_charset(), "latin1");
        assert_eq!(config.get_limits().get_fields(), 5);
        assert_eq!(config.get_limits().get_field_name_size(), 100);
    }

    #[test]
    fn test_deserialize_empty() {
        let config: FormConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FormConfig::default());
    }
}
