//! Message lifecycle and failure taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Why a receiving message terminated without content.
///
/// Persisted on the message so the failure can be rendered inline and the
/// message retried later.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailedReason {
    Network,
    Authentication,
    RateLimit,
    Client,
    Server,
    Unknown,
}

impl std::fmt::Display for FailedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailedReason::Network => "Network error",
            FailedReason::Authentication => "Unauthenticated",
            FailedReason::RateLimit => "Rate limited",
            FailedReason::Client => "Client error",
            FailedReason::Server => "Server error",
            FailedReason::Unknown => "Unknown error",
        };
        write!(f, "{label}")
    }
}

/// One turn of a conversation.
///
/// `content` is absent while a streamed response is still in flight; the
/// `receiving` flag marks that state. `processed_content`, when present, is
/// what actually goes over the wire instead of `content`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_content: Option<String>,
    #[serde(default)]
    pub receiving: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<FailedReason>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn with_role(chat_id: Uuid, role: Role, content: Option<String>) -> Self {
        Message {
            id: Uuid::new_v4(),
            chat_id,
            role,
            content,
            processed_content: None,
            receiving: false,
            failed_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn system(chat_id: Uuid, content: impl Into<String>) -> Self {
        Self::with_role(chat_id, Role::System, Some(content.into()))
    }

    pub fn user(chat_id: Uuid, content: impl Into<String>) -> Self {
        Self::with_role(chat_id, Role::User, Some(content.into()))
    }

    pub fn assistant(chat_id: Uuid, content: impl Into<String>) -> Self {
        Self::with_role(chat_id, Role::Assistant, Some(content.into()))
    }

    /// Placeholder assistant message awaiting a streamed response.
    pub fn receiving(chat_id: Uuid) -> Self {
        let mut message = Self::with_role(chat_id, Role::Assistant, None);
        message.receiving = true;
        message
    }

    /// The text to transmit: processed content wins over raw content.
    pub fn outgoing_text(&self) -> &str {
        self.processed_content
            .as_deref()
            .or(self.content.as_deref())
            .unwrap_or("")
    }

    /// Terminal success: content final, no longer receiving.
    pub fn finalize(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
        self.receiving = false;
        self.failed_reason = None;
    }

    /// Terminal failure: content stays absent, reason persisted.
    pub fn fail(&mut self, reason: FailedReason) {
        self.content = None;
        self.receiving = false;
        self.failed_reason = Some(reason);
    }

    /// Re-arm a failed receiving message for retry in place.
    ///
    /// Identity, role and timestamp are untouched; the same message is
    /// streamed into again rather than duplicated.
    pub fn clear_for_retry(&mut self) {
        self.content = None;
        self.processed_content = None;
        self.failed_reason = None;
        self.receiving = true;
    }

    pub fn is_failed(&self) -> bool {
        self.failed_reason.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiving_message_starts_without_content() {
        let message = Message::receiving(Uuid::new_v4());
        assert_eq!(message.role, Role::Assistant);
        assert!(message.receiving);
        assert!(message.content.is_none());
        assert!(message.failed_reason.is_none());
    }

    #[test]
    fn finalize_clears_receiving_state() {
        let mut message = Message::receiving(Uuid::new_v4());
        message.finalize("done");
        assert!(!message.receiving);
        assert_eq!(message.content.as_deref(), Some("done"));
    }

    #[test]
    fn fail_leaves_content_absent() {
        let mut message = Message::receiving(Uuid::new_v4());
        message.fail(FailedReason::RateLimit);
        assert!(!message.receiving);
        assert!(message.content.is_none());
        assert_eq!(message.failed_reason, Some(FailedReason::RateLimit));
    }

    #[test]
    fn clear_for_retry_keeps_identity() {
        let mut message = Message::receiving(Uuid::new_v4());
        let id = message.id;
        let created_at = message.created_at;
        message.fail(FailedReason::Server);
        message.clear_for_retry();
        assert_eq!(message.id, id);
        assert_eq!(message.created_at, created_at);
        assert!(message.receiving);
        assert!(message.content.is_none());
        assert!(message.failed_reason.is_none());
    }

    #[test]
    fn outgoing_text_prefers_processed_content() {
        let mut message = Message::user(Uuid::new_v4(), "raw");
        assert_eq!(message.outgoing_text(), "raw");
        message.processed_content = Some("processed".to_string());
        assert_eq!(message.outgoing_text(), "processed");
        message.content = None;
        message.processed_content = None;
        assert_eq!(message.outgoing_text(), "");
    }

    #[test]
    fn failed_reason_labels() {
        assert_eq!(FailedReason::Authentication.to_string(), "Unauthenticated");
        assert_eq!(FailedReason::RateLimit.to_string(), "Rate limited");
    }
}
