//! Error types for the completion client.

use thiserror::Error;

/// Every failure of a completion or model-listing call.
///
/// The `Display` output is the single human-readable message surfaced to
/// callers; for `Api` it is the message extracted from the response body or
/// the synthesized `HTTP <status>: <reason>` string.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Non-2xx response from the service.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or a synthesized status line.
        message: String,
    },

    /// Transport failure (DNS, connect, TLS, timeout, body read).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Successful response whose body was not JSON.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL could not be parsed or joined.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// Successful response without any message content.
    #[error("the completion contained no message content")]
    EmptyResponse,
}

impl CompletionError {
    /// HTTP status for `Api` errors, or the status carried by a transport error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) | Self::InvalidBaseUrl(_) | Self::EmptyResponse => None,
        }
    }

    /// Whether the service rejected the credential.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Whether the service throttled the request.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

/// Convenience result alias for completion calls.
pub type CompletionResult<T> = Result<T, CompletionError>;
