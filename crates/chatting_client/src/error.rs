//! Client error taxonomy and HTTP status mapping.

use chat_core::FailedReason;
use reqwest::StatusCode;
use thiserror::Error;

/// Longest error body kept for logs and user-facing messages.
const MAX_ERROR_BODY_CHARS: usize = 1_024;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The vendor answered with a non-success status.
    #[error("{1}")]
    Http(FailedReason, String),

    /// The connection itself failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response arrived but its envelope could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Credential validation was rejected.
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Project onto the per-message failure taxonomy.
    pub fn failed_reason(&self) -> FailedReason {
        match self {
            ClientError::Http(reason, _) => *reason,
            ClientError::Transport(_) => FailedReason::Network,
            ClientError::Decode(_) => FailedReason::Unknown,
            ClientError::Validation(_) => FailedReason::Unknown,
        }
    }
}

/// Shared status mapping: 401 authentication, 429 rate limit, remaining
/// 4xx client, 5xx server, anything else unknown.
pub(crate) fn reason_for_status(status: StatusCode) -> FailedReason {
    match status.as_u16() {
        401 => FailedReason::Authentication,
        429 => FailedReason::RateLimit,
        400..=499 => FailedReason::Client,
        500..=599 => FailedReason::Server,
        _ => FailedReason::Unknown,
    }
}

/// Cap an error body before it reaches logs or the caller.
pub(crate) fn truncate_body(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }
    let char_count = trimmed.chars().count();
    if char_count <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!(
        "{}... [truncated {} chars]",
        truncated,
        char_count - MAX_ERROR_BODY_CHARS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            reason_for_status(StatusCode::UNAUTHORIZED),
            FailedReason::Authentication
        );
        assert_eq!(
            reason_for_status(StatusCode::TOO_MANY_REQUESTS),
            FailedReason::RateLimit
        );
        assert_eq!(
            reason_for_status(StatusCode::IM_A_TEAPOT),
            FailedReason::Client
        );
        assert_eq!(
            reason_for_status(StatusCode::SERVICE_UNAVAILABLE),
            FailedReason::Server
        );
        assert_eq!(
            reason_for_status(StatusCode::PERMANENT_REDIRECT),
            FailedReason::Unknown
        );
    }

    #[test]
    fn transport_errors_project_to_network() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.failed_reason(), FailedReason::Network);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "e".repeat(5_000);
        let truncated = truncate_body(&body);
        assert!(truncated.len() < body.len());
        assert!(truncated.contains("[truncated"));
        assert_eq!(truncate_body("   "), "<empty error response body>");
    }
}
