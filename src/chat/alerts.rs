//! Turning completion failures into inline assistant messages.

use crate::llm::error::CompletionError;

/// Prefix of every synthetic error turn.
pub const WARNING_GLYPH: &str = "⚠️";

const INVALID_API_KEY: &str = "Invalid API key. Please check your API key in settings.";
const RATE_LIMITED: &str = "Rate limit exceeded. Please wait a moment and try again.";
const SERVICE_UNAVAILABLE: &str =
    "The AI service is temporarily unavailable. Please try again later.";
const MODEL_UNAVAILABLE: &str =
    "The selected model is not available. Please choose a different model.";

/// Broad failure classes with a dedicated user-facing text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential rejected.
    InvalidApiKey,
    /// Request throttled.
    RateLimited,
    /// Server-side outage.
    ServiceUnavailable,
    /// Unknown or inaccessible model.
    ModelUnavailable,
    /// Anything else; the raw message is shown.
    Other,
}

/// Classify a failure by HTTP status first, then by its message text.
#[must_use]
pub fn classify(err: &CompletionError) -> FailureKind {
    match err.status() {
        Some(401) => return FailureKind::InvalidApiKey,
        Some(429) => return FailureKind::RateLimited,
        Some(500 | 502 | 503) => return FailureKind::ServiceUnavailable,
        _ => {}
    }

    let message = err.to_string();
    if message.contains("401") {
        FailureKind::InvalidApiKey
    } else if message.contains("429") {
        FailureKind::RateLimited
    } else if ["500", "502", "503"].iter().any(|code| message.contains(code)) {
        FailureKind::ServiceUnavailable
    } else if message.contains("model") {
        FailureKind::ModelUnavailable
    } else {
        FailureKind::Other
    }
}

/// Text shown to the user for `err`; unmatched failures show the raw message.
#[must_use]
pub fn user_facing_message(err: &CompletionError) -> String {
    match classify(err) {
        FailureKind::InvalidApiKey => INVALID_API_KEY.to_string(),
        FailureKind::RateLimited => RATE_LIMITED.to_string(),
        FailureKind::ServiceUnavailable => SERVICE_UNAVAILABLE.to_string(),
        FailureKind::ModelUnavailable => MODEL_UNAVAILABLE.to_string(),
        FailureKind::Other => err.to_string(),
    }
}

/// Body of the assistant turn appended after a failed completion.
#[must_use]
pub fn format_error_reply(err: &CompletionError) -> String {
    format!("{WARNING_GLYPH} {}", user_facing_message(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> CompletionError {
        CompletionError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_status_takes_precedence() {
        assert_eq!(classify(&api(401, "Incorrect API key")), FailureKind::InvalidApiKey);
        assert_eq!(classify(&api(429, "slow down")), FailureKind::RateLimited);
        assert_eq!(classify(&api(502, "bad gateway")), FailureKind::ServiceUnavailable);
    }

    #[test]
    fn test_message_fallback() {
        assert_eq!(
            classify(&api(404, "The model `gpt-9` does not exist")),
            FailureKind::ModelUnavailable
        );
        assert_eq!(
            classify(&api(400, "HTTP 400: upstream said 503")),
            FailureKind::ServiceUnavailable
        );
        assert_eq!(classify(&api(400, "context too long")), FailureKind::Other);
        assert_eq!(classify(&CompletionError::EmptyResponse), FailureKind::Other);
    }

    #[test]
    fn test_user_facing_message() {
        assert!(user_facing_message(&api(401, "Incorrect API key")).starts_with("Invalid API key"));
        assert_eq!(user_facing_message(&api(400, "context too long")), "context too long");
    }

    #[test]
    fn test_error_reply_has_warning_prefix() {
        let reply = format_error_reply(&api(429, "Too many requests"));
        assert_eq!(reply, format!("{WARNING_GLYPH} {RATE_LIMITED}"));
    }
}
