/// Probe failure classifications
///
/// This module defines every way a probe can fail. The set is closed: the
/// snapshot and history documents only ever carry these values.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents why a probe did not produce a usable URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request did not complete within the configured timeout
    Timeout,

    /// Connection refused, reset, or the host could not be resolved
    ConnectionError,

    /// The server answered with a status other than 200
    HttpError,

    /// TLS handshake or certificate verification failed
    SslError,

    /// HTTP 200, but the body lacks the site's keyword
    InvalidContent,

    /// Anything else, including malformed candidate URLs
    UnknownError,
}

impl ErrorKind {
    /// Returns true if failures of this kind may be retried
    ///
    /// A kind being retryable is necessary but not sufficient: an `HttpError`
    /// is only retried when the status is 403, 429 or 503.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionError | Self::HttpError
        )
    }

    /// Returns the wire representation used in snapshot documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
            Self::HttpError => "http_error",
            Self::SslError => "ssl_error",
            Self::InvalidContent => "invalid_content",
            Self::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
