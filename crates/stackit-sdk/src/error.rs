//! Error types for API calls.

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors that can occur while talking to a STACKIT API.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No access token was configured for the transport.
    #[error("not authenticated: no access token configured")]
    Unauthenticated,

    /// The API answered with a non-success status code.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The request or response body did not match the expected model.
    #[error("decode body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A path segment would be collapsed by URL normalization.
    #[error("invalid request path {path:?}: empty or dot segment")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// The transport configuration is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

impl SdkError {
    /// Builds an [`SdkError::Http`] from a status and the raw response body.
    ///
    /// The API reports errors as `{"message": "..."}`; anything else is kept
    /// verbatim.
    #[must_use]
    pub fn http(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_owned());
        let message = if message.is_empty() {
            "no response body".to_owned()
        } else {
            message
        };
        Self::Http { status, message }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code, if the API answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Connection failures, throttling and gateway errors are transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => matches!(*status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_extracts_message_field() {
        let err = SdkError::http(404, br#"{"message":"key ring not found"}"#);
        assert_eq!(err.to_string(), "HTTP 404: key ring not found");
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn http_error_keeps_plain_body() {
        let err = SdkError::http(500, b"  upstream exploded \n");
        assert_eq!(err.to_string(), "HTTP 500: upstream exploded");
    }

    #[test]
    fn http_error_with_empty_body() {
        let err = SdkError::http(403, b"");
        assert_eq!(err.to_string(), "HTTP 403: no response body");
    }

    #[test]
    fn transient_classification() {
        assert!(SdkError::transport("connection reset").is_transient());
        assert!(SdkError::http(429, b"").is_transient());
        assert!(SdkError::http(503, b"").is_transient());
        assert!(!SdkError::http(400, b"").is_transient());
        assert!(!SdkError::Unauthenticated.is_transient());
    }

    #[test]
    fn status_accessor() {
        assert_eq!(SdkError::http(409, b"").status(), Some(409));
        assert_eq!(SdkError::Unauthenticated.status(), None);
    }
}
