//! Anthropic-style adapter: flattened prompts, cumulative replace deltas.

use std::collections::HashMap;

use async_trait::async_trait;
use chat_core::{AdapterSettings, FailedReason, Role, Temperature};
use context_manager::Turn;
use lazy_static::lazy_static;
use log::{error, warn};
use reqwest::{Method, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::adapter::ChattingAdapter;
use crate::adapters::base_url;
use crate::delta::StreamDelta;
use crate::error::{reason_for_status, truncate_body, ClientError};
use crate::http::{build_http_client, build_retry_client};
use crate::transport::{EventStreamRequest, StreamItem, StreamTransport};

const DEFAULT_BASE: &str = "https://api.anthropic.com";

/// Keeps the model from role-playing the next human turn.
const STOP_SEQUENCE: &str = "\n\nHuman:";

const MAX_TOKENS_TO_SAMPLE: u32 = 2048;

const MODELS: &[&str] = &[
    "claude-v1",
    "claude-v1-100k",
    "claude-instant-v1",
    "claude-instant-v1-100k",
];

lazy_static! {
    static ref CONTEXT_WINDOWS: HashMap<&'static str, usize> = HashMap::from([
        ("claude-v1", 9000),
        ("claude-v1-100k", 100_000),
        ("claude-instant-v1", 9000),
        ("claude-instant-v1-100k", 100_000),
    ]);
}

#[derive(Serialize, Debug)]
struct CompletionRequest {
    prompt: String,
    model: String,
    max_tokens_to_sample: u32,
    stop_sequences: Vec<String>,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    completion: String,
}

#[derive(Deserialize, Debug, Default)]
struct StreamCompletion {
    #[serde(default)]
    completion: Option<String>,
}

pub struct AnthropicAdapter {
    settings: AdapterSettings,
    http: ClientWithMiddleware,
    transport: StreamTransport,
}

impl AnthropicAdapter {
    pub fn new(settings: AdapterSettings) -> anyhow::Result<Self> {
        let client = build_http_client(&settings)?;
        Ok(AnthropicAdapter {
            http: build_retry_client(client.clone()),
            transport: StreamTransport::new(client),
            settings,
        })
    }

    fn complete_url(&self) -> String {
        format!(
            "{}/v1/complete",
            base_url(self.settings.domain.as_deref(), DEFAULT_BASE)
        )
    }

    /// Flatten turns into the alternating Human/Assistant prompt format.
    ///
    /// The system prompt becomes a synthetic leading exchange acknowledged
    /// with "OK"; the prompt always ends with an open Assistant segment
    /// awaiting the completion.
    fn build_prompt(turns: &[Turn]) -> String {
        let mut prompt = String::new();
        for turn in turns {
            match turn.role {
                Role::System => {
                    prompt.push_str("\n\nHuman: ");
                    prompt.push_str(&turn.text);
                    prompt.push_str("\n\nAssistant: OK");
                }
                Role::User => {
                    prompt.push_str("\n\nHuman: ");
                    prompt.push_str(&turn.text);
                }
                Role::Assistant => {
                    prompt.push_str("\n\nAssistant: ");
                    prompt.push_str(&turn.text);
                }
            }
        }
        prompt.push_str("\n\nAssistant: ");
        prompt
    }

    fn build_request(turns: &[Turn], model: &str, temperature: f32, stream: bool) -> CompletionRequest {
        CompletionRequest {
            prompt: Self::build_prompt(turns),
            model: model.to_string(),
            max_tokens_to_sample: MAX_TOKENS_TO_SAMPLE,
            stop_sequences: vec![STOP_SEQUENCE.to_string()],
            temperature,
            stream,
        }
    }

    /// OpenAI's mapping except 403: behind a proxy or a wrong domain the
    /// vendor answers 403 before credentials are even looked at, so it
    /// signals a network problem rather than an authentication one.
    fn reason_for(status: StatusCode) -> FailedReason {
        if status == StatusCode::FORBIDDEN {
            FailedReason::Network
        } else {
            reason_for_status(status)
        }
    }

    async fn request_completion(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: f32,
    ) -> Result<String, ClientError> {
        let request = Self::build_request(turns, model, temperature, false);

        let response = self
            .http
            .post(self.complete_url())
            .header("x-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                error!("Failed to send completion request: {err}");
                ClientError::Transport(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(&response.text().await.unwrap_or_default());
            error!("Anthropic API error (status {status}): {body}");
            return Err(ClientError::Http(
                Self::reason_for(status),
                format!("Anthropic API error (status {status}): {body}"),
            ));
        }

        let envelope: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ClientError::Decode(format!("Anthropic response: {err}")))?;

        Ok(envelope.completion)
    }
}

#[async_trait]
impl ChattingAdapter for AnthropicAdapter {
    fn vendor(&self) -> &'static str {
        "anthropic"
    }

    fn models(&self) -> &'static [&'static str] {
        MODELS
    }

    fn default_model(&self) -> &'static str {
        "claude-v1"
    }

    fn context_window(&self, model: &str) -> usize {
        CONTEXT_WINDOWS.get(model).copied().unwrap_or(9000)
    }

    async fn validate_config(&self) -> Result<(), ClientError> {
        // Fixed two-segment prompt: one human turn plus the open assistant
        // segment the completion fills.
        let turns = [Turn::new(Role::User, "Test")];
        match self
            .request_completion(&turns, self.default_model(), 1.0)
            .await
        {
            Ok(text) if text.trim().is_empty() => Err(ClientError::Validation(
                "Anthropic returned an empty response".to_string(),
            )),
            Ok(_) => Ok(()),
            Err(err) => Err(ClientError::Validation(format!(
                "Anthropic credential check failed: {err}"
            ))),
        }
    }

    async fn send_blocking(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: Temperature,
    ) -> Result<String, ClientError> {
        self.request_completion(turns, model, temperature.anthropic_value())
            .await
    }

    async fn send_streaming(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: Temperature,
        tx: mpsc::Sender<StreamDelta>,
    ) -> Result<(), ClientError> {
        let request = Self::build_request(turns, model, temperature.anthropic_value(), true);
        let open = self
            .transport
            .open(EventStreamRequest {
                url: self.complete_url(),
                method: Method::POST,
                headers: vec![("x-api-key".to_string(), self.settings.api_key.clone())],
                body: serde_json::to_value(&request)
                    .map_err(|err| ClientError::Decode(err.to_string()))?,
            })
            .await;

        let mut events = match open {
            Ok(events) => events,
            Err(crate::transport::OpenError::Status { code, body }) => {
                error!("Anthropic stream rejected (status {code}): {body}");
                return Err(ClientError::Http(
                    Self::reason_for(code),
                    format!("Anthropic API error (status {code}): {body}"),
                ));
            }
            Err(crate::transport::OpenError::Connect(err)) => {
                error!("Anthropic stream connection failed: {err}");
                return Err(ClientError::Transport(err));
            }
        };

        while let Some(item) = events.next_item().await {
            match item {
                Ok(StreamItem::Done) => break,
                Ok(StreamItem::Frame(frame)) => {
                    let event = match serde_json::from_str::<StreamCompletion>(&frame.data) {
                        Ok(event) => event,
                        Err(err) => {
                            error!("Failed to parse stream event: {err}, data: {}", frame.data);
                            continue;
                        }
                    };
                    // Each event carries the cumulative completion so far;
                    // it replaces the accumulated text outright.
                    let Some(completion) = event.completion else {
                        continue;
                    };
                    if tx.send(StreamDelta::Replace(completion)).await.is_err() {
                        warn!("Failed to send completion snapshot - receiver dropped.");
                        break;
                    }
                }
                Err(err) => {
                    error!("Error in SSE stream: {err}");
                    return Err(ClientError::Transport(err));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new(AdapterSettings {
            api_key: "ak-test".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn prompt_flattens_history_with_system_exchange() {
        let turns = [
            Turn::new(Role::System, "You are terse."),
            Turn::new(Role::User, "hi"),
            Turn::new(Role::Assistant, "hello"),
            Turn::new(Role::User, "how are you"),
        ];
        let prompt = AnthropicAdapter::build_prompt(&turns);
        assert_eq!(
            prompt,
            "\n\nHuman: You are terse.\n\nAssistant: OK\
             \n\nHuman: hi\
             \n\nAssistant: hello\
             \n\nHuman: how are you\
             \n\nAssistant: "
        );
    }

    #[test]
    fn prompt_without_turns_is_open_assistant_segment() {
        assert_eq!(AnthropicAdapter::build_prompt(&[]), "\n\nAssistant: ");
    }

    #[test]
    fn request_carries_stop_sequence_and_sampling_cap() {
        let turns = [Turn::new(Role::User, "hi")];
        let request = AnthropicAdapter::build_request(&turns, "claude-v1", 0.7, true);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "claude-v1");
        assert_eq!(value["stop_sequences"][0], "\n\nHuman:");
        assert_eq!(value["max_tokens_to_sample"], 2048);
        assert_eq!(value["stream"], true);
    }

    #[test]
    fn forbidden_maps_to_network_not_authentication() {
        assert_eq!(
            AnthropicAdapter::reason_for(StatusCode::FORBIDDEN),
            FailedReason::Network
        );
        assert_eq!(
            AnthropicAdapter::reason_for(StatusCode::UNAUTHORIZED),
            FailedReason::Authentication
        );
    }

    #[test]
    fn url_uses_default_domain() {
        assert_eq!(adapter().complete_url(), "https://api.anthropic.com/v1/complete");
    }

    #[test]
    fn stream_event_decodes_cumulative_completion() {
        let event: StreamCompletion =
            serde_json::from_str(r#"{"completion":"Hello","stop_reason":null}"#).unwrap();
        assert_eq!(event.completion.as_deref(), Some("Hello"));

        let event: StreamCompletion = serde_json::from_str(r#"{"log_id":"x"}"#).unwrap();
        assert!(event.completion.is_none());
    }
}
