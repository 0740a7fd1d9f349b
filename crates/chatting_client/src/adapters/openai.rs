//! OpenAI-style adapter: chat-message arrays, append deltas.

use std::collections::HashMap;

use async_trait::async_trait;
use chat_core::{AdapterSettings, Role, Temperature};
use context_manager::Turn;
use lazy_static::lazy_static;
use log::{error, warn};
use reqwest::Method;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::adapter::ChattingAdapter;
use crate::adapters::{base_url, role_name};
use crate::delta::StreamDelta;
use crate::error::{reason_for_status, truncate_body, ClientError};
use crate::http::{build_http_client, build_retry_client};
use crate::transport::{EventStreamRequest, StreamItem, StreamTransport};

const DEFAULT_BASE: &str = "https://api.openai.com";

const MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-3.5-turbo-16k", "gpt-4", "gpt-4-32k"];

lazy_static! {
    static ref CONTEXT_WINDOWS: HashMap<&'static str, usize> = HashMap::from([
        ("gpt-3.5-turbo", 4096),
        ("gpt-3.5-turbo-16k", 16384),
        ("gpt-4", 8192),
        ("gpt-4-32k", 32768),
    ]);
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: DeltaPayload,
}

#[derive(Deserialize, Debug, Default)]
struct DeltaPayload {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiAdapter {
    settings: AdapterSettings,
    http: ClientWithMiddleware,
    transport: StreamTransport,
}

impl OpenAiAdapter {
    pub fn new(settings: AdapterSettings) -> anyhow::Result<Self> {
        let client = build_http_client(&settings)?;
        Ok(OpenAiAdapter {
            http: build_retry_client(client.clone()),
            transport: StreamTransport::new(client),
            settings,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            base_url(self.settings.domain.as_deref(), DEFAULT_BASE)
        )
    }

    fn build_request(turns: &[Turn], model: &str, temperature: f32, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: turns
                .iter()
                .map(|turn| WireMessage {
                    role: role_name(turn.role).to_string(),
                    content: turn.text.clone(),
                })
                .collect(),
            temperature,
            stream,
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
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                error!("Failed to send chat completion request: {err}");
                ClientError::Transport(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(&response.text().await.unwrap_or_default());
            error!("OpenAI API error (status {status}): {body}");
            return Err(ClientError::Http(
                reason_for_status(status),
                format!("OpenAI API error (status {status}): {body}"),
            ));
        }

        let envelope: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ClientError::Decode(format!("OpenAI response: {err}")))?;

        envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ClientError::Decode("OpenAI response contained no choices".to_string()))
    }
}

#[async_trait]
impl ChattingAdapter for OpenAiAdapter {
    fn vendor(&self) -> &'static str {
        "openai"
    }

    fn models(&self) -> &'static [&'static str] {
        MODELS
    }

    fn default_model(&self) -> &'static str {
        "gpt-3.5-turbo"
    }

    fn context_window(&self, model: &str) -> usize {
        CONTEXT_WINDOWS.get(model).copied().unwrap_or(4096)
    }

    async fn validate_config(&self) -> Result<(), ClientError> {
        let turns = [Turn::new(Role::User, "Test")];
        match self
            .request_completion(&turns, self.default_model(), 1.0)
            .await
        {
            Ok(text) if text.trim().is_empty() => Err(ClientError::Validation(
                "OpenAI returned an empty response".to_string(),
            )),
            Ok(_) => Ok(()),
            Err(err) => Err(ClientError::Validation(format!(
                "OpenAI credential check failed: {err}"
            ))),
        }
    }

    async fn send_blocking(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: Temperature,
    ) -> Result<String, ClientError> {
        self.request_completion(turns, model, temperature.openai_value())
            .await
    }

    async fn send_streaming(
        &self,
        turns: &[Turn],
        model: &str,
        temperature: Temperature,
        tx: mpsc::Sender<StreamDelta>,
    ) -> Result<(), ClientError> {
        let request = Self::build_request(turns, model, temperature.openai_value(), true);
        let open = self
            .transport
            .open(EventStreamRequest {
                url: self.completions_url(),
                method: Method::POST,
                headers: vec![(
                    "Authorization".to_string(),
                    format!("Bearer {}", self.settings.api_key),
                )],
                body: serde_json::to_value(&request)
                    .map_err(|err| ClientError::Decode(err.to_string()))?,
            })
            .await;

        let mut events = match open {
            Ok(events) => events,
            Err(crate::transport::OpenError::Status { code, body }) => {
                error!("OpenAI stream rejected (status {code}): {body}");
                return Err(ClientError::Http(
                    reason_for_status(code),
                    format!("OpenAI API error (status {code}): {body}"),
                ));
            }
            Err(crate::transport::OpenError::Connect(err)) => {
                error!("OpenAI stream connection failed: {err}");
                return Err(ClientError::Transport(err));
            }
        };

        while let Some(item) = events.next_item().await {
            match item {
                Ok(StreamItem::Done) => break,
                Ok(StreamItem::Frame(frame)) => {
                    let chunk = match serde_json::from_str::<StreamChunk>(&frame.data) {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            // Heartbeat/comment frames are not failures; drop
                            // the frame and keep the session alive.
                            error!("Failed to parse stream chunk: {err}, data: {}", frame.data);
                            continue;
                        }
                    };
                    let Some(content) = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                    else {
                        continue;
                    };
                    if content.is_empty() {
                        continue;
                    }
                    if tx.send(StreamDelta::Append(content)).await.is_err() {
                        warn!("Failed to send chunk - receiver dropped.");
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
