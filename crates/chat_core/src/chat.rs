//! Chat configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sampling temperature preset.
///
/// Vendors disagree on the numeric scale, so the preset maps to a concrete
/// value per adapter instead of storing a raw float.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Temperature {
    Creative,
    Balanced,
    Precise,
}

impl Temperature {
    /// Value on the OpenAI 0-2 scale.
    pub fn openai_value(self) -> f32 {
        match self {
            Temperature::Creative => 1.5,
            Temperature::Balanced => 1.0,
            Temperature::Precise => 0.2,
        }
    }

    /// Value on the Anthropic 0-1 scale.
    pub fn anthropic_value(self) -> f32 {
        match self {
            Temperature::Creative => 1.0,
            Temperature::Balanced => 0.7,
            Temperature::Precise => 0.2,
        }
    }
}

/// A conversation configuration.
///
/// Messages are owned by the store, ordered by timestamp; the chat only
/// carries the knobs that shape outbound requests plus display metadata.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Chat {
    pub id: Uuid,
    pub name: String,
    pub temperature: Temperature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_prefix: Option<String>,
    pub model: String,
    /// Number of prior turns to send; 0 means system prompt only.
    pub history_length_to_send: usize,
    #[serde(default)]
    pub auto_copy: bool,
    pub icon: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Chat {
            id: Uuid::new_v4(),
            name: name.into(),
            temperature: Temperature::Balanced,
            system_prompt: None,
            message_prefix: None,
            model: model.into(),
            history_length_to_send: 4,
            auto_copy: false,
            icon: "bubble".to_string(),
            color: "blue".to_string(),
            created_at: Utc::now(),
        }
    }
}
