//! Adapter capability interface and model resolution.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{Chat, Message, Settings, Temperature};
use context_manager::{ContextAssembler, Turn};
use tokio::sync::mpsc;

use crate::adapters::anthropic::AnthropicAdapter;
use crate::adapters::openai::OpenAiAdapter;
use crate::delta::StreamDelta;
use crate::error::ClientError;

/// The per-vendor chat completion capability.
///
/// Implementations build a vendor request from assembled turns, issue
/// blocking and streaming requests, and map vendor failures onto the shared
/// taxonomy. The streaming delta variant (append vs. replace) is part of
/// the implementation, not a caller choice.
#[async_trait]
pub trait ChattingAdapter: Send + Sync {
    fn vendor(&self) -> &'static str;

    /// Model identifiers this adapter serves, in display order.
    fn models(&self) -> &'static [&'static str];

    fn default_model(&self) -> &'static str;

    /// Maximum context size for a model, in estimated tokens.
    fn context_window(&self, model: &str) -> usize;

    /// Build the bounded turn sequence for a request against `model`'s
    /// context window.
    fn assemble_context(
        &self,
        chat: &Chat,
        history: &[Message],
        receiving_index: Option<usize>,
    ) -> Vec<Turn> {
        ContextAssembler::new().assemble(
            history,
            receiving_index,
            chat.system_prompt.as_deref(),
            chat.history_length_to_send,
            self.context_window(&chat.model),
        )
    }

    /// Issue a minimal request to check the configured credentials.
    async fn validate_config(&self) -> Result<(), ClientError>;

    /// One-shot request; resolves to the final completion text.
    async fn send_blocking(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: Temperature,
    ) -> Result<String, ClientError>;

    /// Streaming request; deltas flow through `tx` in transport order and
    /// the return value is the terminal outcome.
    async fn send_streaming(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: Temperature,
        tx: mpsc::Sender<StreamDelta>,
    ) -> Result<(), ClientError>;
}

/// Model-identifier to adapter resolution.
///
/// A closed set of built-in adapters; resolution is a pure scan of each
/// adapter's model table.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn ChattingAdapter>>,
}

impl AdapterRegistry {
    /// Build one adapter per configured vendor section.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut adapters: Vec<Arc<dyn ChattingAdapter>> = Vec::new();
        if let Some(openai) = &settings.openai {
            adapters.push(Arc::new(OpenAiAdapter::new(openai.clone())?));
        }
        if let Some(anthropic) = &settings.anthropic {
            adapters.push(Arc::new(AnthropicAdapter::new(anthropic.clone())?));
        }
        Ok(AdapterRegistry { adapters })
    }

    /// Registry over explicit adapter instances.
    pub fn with_adapters(adapters: Vec<Arc<dyn ChattingAdapter>>) -> Self {
        AdapterRegistry { adapters }
    }

    /// The adapter serving `model`, if any.
    ///
    /// The handle is owned so a detached streaming task can outlive the
    /// caller's borrow of the registry.
    pub fn resolve(&self, model: &str) -> Option<Arc<dyn ChattingAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.models().contains(&model))
            .cloned()
    }

    /// Every model of every configured adapter, in registration order.
    pub fn all_models(&self) -> Vec<&'static str> {
        self.adapters
            .iter()
            .flat_map(|adapter| adapter.models().iter().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::AdapterSettings;

    fn registry() -> AdapterRegistry {
        let settings = Settings {
            openai: Some(AdapterSettings {
                api_key: "sk-test".to_string(),
                ..Default::default()
            }),
            anthropic: Some(AdapterSettings {
                api_key: "ak-test".to_string(),
                ..Default::default()
            }),
        };
        AdapterRegistry::from_settings(&settings).unwrap()
    }

    #[test]
    fn resolves_every_listed_model() {
        let registry = registry();
        for model in registry.all_models() {
            assert!(
                registry.resolve(model).is_some(),
                "model {model} did not resolve"
            );
        }
    }

    #[test]
    fn unknown_model_does_not_resolve() {
        assert!(registry().resolve("llama-70b").is_none());
    }

    #[test]
    fn resolution_picks_the_owning_vendor() {
        let registry = registry();
        assert_eq!(registry.resolve("gpt-4").unwrap().vendor(), "openai");
        assert_eq!(
            registry.resolve("claude-v1").unwrap().vendor(),
            "anthropic"
        );
    }

    #[test]
    fn unconfigured_vendor_is_absent() {
        let settings = Settings {
            openai: Some(AdapterSettings {
                api_key: "sk-test".to_string(),
                ..Default::default()
            }),
            anthropic: None,
        };
        let registry = AdapterRegistry::from_settings(&settings).unwrap();
        assert!(registry.resolve("claude-v1").is_none());
        assert!(registry.resolve("gpt-3.5-turbo").is_some());
    }
}
