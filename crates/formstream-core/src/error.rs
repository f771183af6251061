//! Errors raised by form decoders.

/// The single error channel of a [`FormDecoder`](crate::FormDecoder).
///
/// Configuration errors come back from the constructor before any byte is
/// processed. Malformed-input errors come back from `write`, `resume` or
/// `end` exactly once; after that every call returns [`FormError::Closed`].
/// Limit breaches are never errors; they are reported through
/// [`FormHandler::on_limit`](crate::FormHandler::on_limit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// No `Content-Type` header was supplied.
    MissingContentType,
    /// The `Content-Type` value could not be parsed.
    MalformedContentType,
    /// The body type is neither multipart/form-data nor urlencoded.
    UnsupportedContentType {
        /// The offending media type, lower-cased.
        content_type: String,
    },
    /// A multipart body without a usable `boundary` parameter.
    MissingBoundary,
    /// A configured default charset names no known decoder.
    UnsupportedCharset {
        /// The charset label as configured.
        charset: String,
    },
    /// A part header block was invalid or too large.
    MalformedPartHeader,
    /// A urlencoded body had an invalid percent escape.
    MalformedUrlEncoded,
    /// Input ended before the closing boundary.
    UnexpectedEndOfForm,
    /// A file part was cut off; delivered to its stream.
    UnexpectedEndOfFile,
    /// The decoder was destroyed while the part was in flight.
    Aborted,
    /// The decoder already failed, finished or was destroyed.
    Closed,
}

impl FormError {
    /// Returns true for errors raised before any input was processed.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingContentType
                | Self::MalformedContentType
                | Self::UnsupportedContentType { .. }
                | Self::MissingBoundary
                | Self::UnsupportedCharset { .. }
        )
    }

    /// Returns true for errors caused by a malformed body.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedPartHeader
                | Self::MalformedUrlEncoded
                | Self::UnexpectedEndOfForm
                | Self::UnexpectedEndOfFile
        )
    }
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContentType => write!(f, "missing Content-Type"),
            Self::MalformedContentType => write!(f, "malformed Content-Type"),
            Self::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type: {content_type}")
            }
            Self::MissingBoundary => write!(f, "multipart boundary not found"),
            Self::UnsupportedCharset { charset } => {
                write!(f, "unsupported charset: {charset}")
            }
            Self::MalformedPartHeader => write!(f, "malformed part header"),
            Self::MalformedUrlEncoded => write!(f, "malformed urlencoded form"),
            Self::UnexpectedEndOfForm => write!(f, "unexpected end of form"),
            Self::UnexpectedEndOfFile => write!(f, "unexpected end of file"),
            Self::Aborted => write!(f, "form decoding aborted"),
            Self::Closed => write!(f, "form decoder is closed"),
        }
    }
}

impl std::error::Error for FormError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            FormError::UnsupportedContentType {
                content_type: "text/plain".into()
            }
            .to_string(),
            "unsupported content type: text/plain"
        );
        assert_eq!(
            FormError::UnexpectedEndOfForm.to_string(),
            "unexpected end of form"
        );
    }

    #[test]
    fn test_classification() {
        assert!(FormError::MissingBoundary.is_configuration());
        assert!(!FormError::MissingBoundary.is_malformed());
        assert!(FormError::MalformedPartHeader.is_malformed());
        assert!(!FormError::Aborted.is_malformed());
        assert!(!FormError::Closed.is_configuration());
    }
}
