//! Shared error taxonomy.

use thiserror::Error;

/// Errors surfaced to the caller of a send/resend operation.
///
/// Per-message transmission failures are not here; those are persisted on
/// the receiving message as a `FailedReason` instead.
#[derive(Error, Debug)]
pub enum ChatError {
    /// No adapter resolves the chat's configured model.
    #[error("No adapter configured for the selected model")]
    InvalidConfig,

    /// The vendor returned a user-facing error for a blocking send.
    #[error("Sending failed: {0}")]
    Sending(String),

    /// Credential validation was rejected.
    #[error("Validation failed: {0}")]
    Validating(String),

    #[error("Malformed URL")]
    BadUrl,
}

pub type Result<T> = std::result::Result<T, ChatError>;
