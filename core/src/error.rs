//! Error types for the Linkwarden API client.
//!
//! # Design
//! Every failure is returned to the immediate caller; the client never
//! retries or logs. Status-bearing variants keep the raw status and body so a
//! failure can be diagnosed without re-issuing the request. [`ErrorKind`]
//! collapses the variants into the coarse categories callers branch on.

use thiserror::Error;

/// Failure to obtain any HTTP response: DNS, TLS, refused or reset
/// connections, timeouts.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct TransportError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        Self::new(err)
    }
}

/// Errors returned by `LinkwardenClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The base URL handed to the constructor is unusable. No request was made.
    #[error("a valid base_url (starting with http:// or https://) is required, got {0:?}")]
    InvalidBaseUrl(String),

    /// A payload failed validation before being sent.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// 401 or 403.
    #[error("Authentication error ({status}): {body}")]
    Auth { status: u16, body: String },

    /// 404.
    #[error("Resource not found ({status}): {body}")]
    NotFound { status: u16, body: String },

    /// 500 through 599.
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Any other status of 400 or above.
    #[error("HTTP client error ({status}): {body}")]
    Http { status: u16, body: String },

    /// A non-success status that is not an error status, with a body that is
    /// not JSON.
    #[error("Request failed with status {status}, and the response body was not valid JSON: {body}")]
    InvalidJson { status: u16, body: String },

    #[error("A network request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to serialize request payload: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("response did not match the expected shape: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("expected a JSON response but received {0} bytes of non-JSON data")]
    UnexpectedBinary(usize),
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Server,
    /// Everything else: other 4xx, transport failures, malformed bodies.
    Api,
}

impl ApiError {
    /// Classify an error response by status code.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => ApiError::Auth { status, body },
            404 => ApiError::NotFound { status, body },
            500..=599 => ApiError::Server { status, body },
            _ => ApiError::Http { status, body },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidBaseUrl(_) | ApiError::InvalidPayload(_) => ErrorKind::Validation,
            ApiError::Auth { .. } => ErrorKind::Auth,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Http { .. }
            | ApiError::InvalidJson { .. }
            | ApiError::Transport(_)
            | ApiError::Serialization(_)
            | ApiError::Deserialization(_)
            | ApiError::UnexpectedBinary(_) => ErrorKind::Api,
        }
    }

    /// HTTP status of the response that caused this error, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. }
            | ApiError::NotFound { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::Http { status, .. }
            | ApiError::InvalidJson { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body for status-bearing errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Auth { body, .. }
            | ApiError::NotFound { body, .. }
            | ApiError::Server { body, .. }
            | ApiError::Http { body, .. }
            | ApiError::InvalidJson { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn auth_statuses_classify_as_auth() {
        for status in [401, 403] {
            let err = ApiError::from_status(status, "denied");
            assert!(matches!(err, ApiError::Auth { .. }), "{status}");
            assert_eq!(err.kind(), ErrorKind::Auth);
        }
    }

    #[test]
    fn not_found_keeps_status_and_body() {
        let err = ApiError::from_status(404, r#"{"error":"not found"}"#);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some(r#"{"error":"not found"}"#));
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains(r#"{"error":"not found"}"#));
    }

    #[test]
    fn whole_5xx_range_is_server_error() {
        for status in [500, 502, 503, 599] {
            assert_eq!(ApiError::from_status(status, "").kind(), ErrorKind::Server);
        }
        assert_eq!(ApiError::from_status(600, "").kind(), ErrorKind::Api);
    }

    #[test]
    fn other_client_errors_are_generic() {
        for status in [400, 402, 405, 409, 422, 429] {
            let err = ApiError::from_status(status, "nope");
            assert!(matches!(err, ApiError::Http { .. }), "{status}");
            assert_eq!(err.kind(), ErrorKind::Api);
        }
    }

    #[test]
    fn transport_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ApiError::from(TransportError::new(io));
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.status().is_none());
        assert!(err.to_string().contains("refused"));
        assert!(err.source().is_some());
    }

    #[test]
    fn validation_errors_have_validation_kind() {
        assert_eq!(
            ApiError::InvalidBaseUrl("ftp://x".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ApiError::InvalidPayload("blank".to_string()).kind(),
            ErrorKind::Validation
        );
    }
}
