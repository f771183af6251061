//! Streaming `application/x-www-form-urlencoded` decoder.
//!
//! A byte-at-a-time scanner over `key=value&key=value`. Percent escapes are
//! folded in as they arrive; an escape split across two writes is carried in
//! [`Pending`] so it decodes the same as an unsplit one.

use formstream_http::{ContentType, Decoder, EncodeHint, hex_value};
use tracing::{debug, warn};

use crate::config::FormConfig;
use crate::decoder::{Progress, resolve_charset};
use crate::error::FormError;
use crate::event::{FieldInfo, FormHandler, LimitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Key,
    Value,
}

/// A percent escape in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Percent,
    HighNibble(u8),
}

/// Decoded bytes of a key or value, capped at a size limit.
#[derive(Debug, Default)]
struct Buffer {
    bytes: Vec<u8>,
    seen: usize,
    truncated: bool,
    hint: EncodeHint,
}

impl Buffer {
    fn push(&mut self, byte: u8, limit: usize) {
        self.seen += 1;
        if self.bytes.len() < limit {
            self.bytes.push(byte);
        } else {
            self.truncated = true;
        }
    }
}

/// Incremental urlencoded body decoder.
#[derive(Debug)]
pub(crate) struct UrlEncodedDecoder {
    charset: String,
    decoder: Decoder,
    mode: Mode,
    pending: Pending,
    key: Buffer,
    value: Buffer,
    field_name_size: usize,
    field_size: usize,
    fields_limit: usize,
    fields: usize,
    fields_hit: bool,
}

impl UrlEncodedDecoder {
    pub(crate) fn new(content_type: &ContentType, config: &FormConfig) -> Result<Self, FormError> {
        let charset = content_type.param("charset").map_or_else(
            || config.get_default_charset().to_owned(),
            str::to_ascii_lowercase,
        );
        let decoder = resolve_charset(&charset)?;
        let limits = config.get_limits();

        debug!(charset = %charset, "urlencoded decoder created");
        Ok(Self {
            charset,
            decoder,
            mode: Mode::Key,
            pending: Pending::None,
            key: Buffer::default(),
            value: Buffer::default(),
            field_name_size: limits.get_field_name_size(),
            field_size: limits.get_field_size(),
            fields_limit: limits.get_fields(),
            fields: 0,
            fields_hit: false,
        })
    }

    /// Decodes `input`. Never blocks.
    pub(crate) fn write<H: FormHandler>(
        &mut self,
        input: &[u8],
        handler: &mut H,
    ) -> Result<Progress, FormError> {
        for &byte in input {
            if self.fields == self.fields_limit {
                if !self.fields_hit {
                    self.fields_hit = true;
                    debug!(limit = self.fields_limit, "fields limit reached");
                    handler.on_limit(LimitKind::Fields);
                }
                break;
            }

            match self.pending {
                Pending::Percent => {
                    self.pending = Pending::HighNibble(Self::nibble(byte)?);
                    continue;
                }
                Pending::HighNibble(high) => {
                    self.pending = Pending::None;
                    let decoded = (high << 4) | Self::nibble(byte)?;
                    self.push_escaped(decoded);
                    continue;
                }
                Pending::None => {}
            }

            match byte {
                b'&' => self.commit(handler),
                b'=' if self.mode == Mode::Key => self.mode = Mode::Value,
                b'%' => self.pending = Pending::Percent,
                b'+' => self.push(b' '),
                _ => self.push(byte),
            }
        }
        Ok(Progress::done(input.len()))
    }

    /// Emits the last pair, if any.
    pub(crate) fn end<H: FormHandler>(&mut self, handler: &mut H) -> Result<(), FormError> {
        if self.pending != Pending::None {
            warn!("urlencoded body ended inside a percent escape");
            return Err(FormError::MalformedUrlEncoded);
        }
        if self.fields < self.fields_limit {
            self.commit(handler);
        }
        debug!(fields = self.fields, "urlencoded body complete");
        Ok(())
    }

    fn nibble(byte: u8) -> Result<u8, FormError> {
        hex_value(byte).ok_or_else(|| {
            warn!(byte, "invalid percent escape");
            FormError::MalformedUrlEncoded
        })
    }

    fn push(&mut self, byte: u8) {
        match self.mode {
            Mode::Key => self.key.push(byte, self.field_name_size),
            Mode::Value => self.value.push(byte, self.field_size),
        }
    }

    fn push_escaped(&mut self, byte: u8) {
        let buffer = match self.mode {
            Mode::Key => &mut self.key,
            Mode::Value => &mut self.value,
        };
        buffer.hint = buffer.hint.with_escape(byte);
        self.push(byte);
    }

    fn commit<H: FormHandler>(&mut self, handler: &mut H) {
        let key = std::mem::take(&mut self.key);
        let value = std::mem::take(&mut self.value);
        self.mode = Mode::Key;
        if key.seen == 0 && value.seen == 0 {
            return;
        }
        self.fields += 1;
        if !handler.accepts_fields() {
            return;
        }

        let (Some(name), Some(text)) = (
            self.decoder.decode(&key.bytes, key.hint),
            self.decoder.decode(&value.bytes, value.hint),
        ) else {
            debug!(charset = %self.charset, "field could not be decoded, dropping");
            return;
        };
        if key.truncated || value.truncated {
            debug!(
                name_truncated = key.truncated,
                value_truncated = value.truncated,
                "field truncated"
            );
        }
        handler.on_field(
            Some(name),
            text,
            FieldInfo {
                name_truncated: key.truncated,
                value_truncated: value.truncated,
                encoding: self.charset.clone(),
                mime_type: "text/plain".to_owned(),
            },
        );
    }
}
