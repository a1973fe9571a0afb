//! Error types for curlkit.
//!
//! Every failure surfaces as an [`Error`] variant. [`Error::kind`] folds the
//! variants onto a small [`ErrorKind`] taxonomy so callers can branch on the
//! category (parse failure, validation, transport, cancellation, ...) without
//! inspecting messages.

use derive_more::{Display, Error, From};

use crate::validate::ValidationError;

// ============================================================================
// Error Kind
// ============================================================================

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Malformed command syntax or variable reference.
    #[display("parse")]
    Parse,
    /// A flag that requires a value had none.
    #[display("missing value")]
    MissingValue,
    /// The request configuration violates a rule.
    #[display("validation")]
    Validation,
    /// Transport-level failure (resolution, connection, handshake, timeout).
    #[display("request")]
    Request,
    /// Failure after a response was received.
    #[display("response")]
    Response,
    /// The retry budget was spent.
    #[display("retry exhausted")]
    RetryExhausted,
    /// The execution was cancelled or its deadline passed.
    #[display("cancelled")]
    Cancelled,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for curlkit operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Malformed command syntax.
    #[display("parse error at byte {position}: {message} (near `{snippet}`)")]
    #[from(skip)]
    Parse {
        /// What went wrong.
        #[error(not(source))]
        message: String,
        /// Input text around the failure.
        snippet: String,
        /// Byte offset of the failure in the input.
        position: usize,
    },

    /// A flag requiring a value was the last token.
    #[display("option {flag} requires a value")]
    #[from(skip)]
    MissingValue {
        /// The flag as written.
        #[error(not(source))]
        flag: String,
    },

    /// A flag token that is not part of the supported option set.
    #[display("unknown option {flag} at byte {position}")]
    #[from(skip)]
    UnknownFlag {
        /// The flag as written.
        #[error(not(source))]
        flag: String,
        /// Byte offset of the flag in the input.
        position: usize,
    },

    /// A `$name` reference with no entry in the variable map.
    #[display("undefined variable `{name}` at byte {position}")]
    #[from(skip)]
    UndefinedVariable {
        /// Variable name.
        #[error(not(source))]
        name: String,
        /// Byte offset of the reference inside the token text.
        position: usize,
    },

    /// The configuration failed validation.
    #[display("validation error: {_0}")]
    #[from]
    Validation(ValidationError),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// An HTTP status treated as a failure.
    #[display("HTTP error {status}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, if available.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// The response arrived but could not be read or decoded.
    #[display("response error: {_0}")]
    #[from(skip)]
    Response(#[error(not(source))] String),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// Retries were exhausted; wraps the last failure.
    #[display("gave up after {attempts} attempts: {last}")]
    #[from(skip)]
    RetryExhausted {
        /// Total attempts made.
        attempts: u32,
        /// The outcome of the final attempt.
        #[error(source)]
        last: Box<Error>,
    },

    /// The execution was cancelled.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// JSON serialization error.
    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Local I/O error (reading `@file` data, TLS material).
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a parse error, capturing a short snippet of `input` at `position`.
    #[must_use]
    pub fn parse(message: impl Into<String>, input: &str, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            snippet: snippet_at(input, position),
            position,
        }
    }

    /// Create a missing value error.
    #[must_use]
    pub fn missing_value(flag: impl Into<String>) -> Self {
        Self::MissingValue { flag: flag.into() }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a response error.
    #[must_use]
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http(status: u16, body: Option<bytes::Bytes>) -> Self {
        Self::Http { status, body }
    }

    /// The taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } | Self::UnknownFlag { .. } | Self::UndefinedVariable { .. } => {
                ErrorKind::Parse
            }
            Self::MissingValue { .. } => ErrorKind::MissingValue,
            Self::Validation(_) | Self::Json(_) | Self::InvalidUrl(_) | Self::Io(_) => {
                ErrorKind::Validation
            }
            Self::Connection(_) | Self::Tls(_) | Self::Timeout => ErrorKind::Request,
            Self::Http { .. }
            | Self::Response(_)
            | Self::TooManyRedirects { .. }
            | Self::InvalidRedirect(_) => ErrorKind::Response,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the execution was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` for transient transport failures worth another attempt.
    ///
    /// Cancellation is never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns the HTTP status code, looking through [`Error::RetryExhausted`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RetryExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// The validation failure, if this is one.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

const SNIPPET_LEN: usize = 24;

/// At most [`SNIPPET_LEN`] characters of `input` starting at `position`.
fn snippet_at(input: &str, position: usize) -> String {
    let mut start = position.min(input.len());
    while !input.is_char_boundary(start) {
        start -= 1;
    }
    input
        .get(start..)
        .unwrap_or_default()
        .chars()
        .take(SNIPPET_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::missing_value("-H");
        assert_eq!(err.to_string(), "option -H requires a value");

        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");
    }

    #[test]
    fn parse_error_captures_snippet() {
        let err = Error::parse("unterminated quote", "curl 'abc", 5);
        let Error::Parse {
            snippet, position, ..
        } = &err
        else {
            panic!("expected parse error, got {err:?}");
        };
        assert_eq!(snippet, "'abc");
        assert_eq!(*position, 5);
    }

    #[test]
    fn snippet_never_splits_characters() {
        // 'é' is two bytes; position 1 lands inside it
        assert_eq!(snippet_at("é", 1), "é");
        assert_eq!(snippet_at("abc", 99), "");
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::missing_value("-d").kind(), ErrorKind::MissingValue);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Request);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(Error::http(500, None).kind(), ErrorKind::Response);
        assert_eq!(
            Error::Validation(ValidationError::MissingUrl).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn retry_exhausted_exposes_last_status() {
        let err = Error::RetryExhausted {
            attempts: 3,
            last: Box::new(Error::http(503, None)),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.kind(), ErrorKind::RetryExhausted);
        assert_eq!(err.to_string(), "gave up after 3 attempts: HTTP error 503");
    }

    #[test]
    fn cancellation_is_not_retryable() {
        assert!(!Error::Cancelled.is_retryable());
        assert!(Error::connection("reset").is_retryable());
    }
}
