//! Send/resend orchestration around the receiving-message lifecycle.

use std::sync::Arc;

use chat_core::{Chat, ChatError, Message, Role, Temperature};
use chatting_client::{AdapterRegistry, ChattingAdapter, StreamDelta};
use context_manager::Turn;
use storage_manager::{MessageStore, StorageError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::preprocess::{process_input, PageTextFetcher};

fn store_err(err: StorageError) -> ChatError {
    ChatError::Sending(format!("storage failure: {err}"))
}

/// Top-level chat API.
///
/// One streaming exchange per chat at a time is the caller's contract; the
/// orchestrator does not lock against a second concurrent send on the same
/// chat. Distinct chats stream concurrently without interference since
/// they touch disjoint message sets.
pub struct ChattingOrchestrator {
    store: Arc<dyn MessageStore>,
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<dyn PageTextFetcher>,
}

impl ChattingOrchestrator {
    pub fn new(
        store: Arc<dyn MessageStore>,
        registry: Arc<AdapterRegistry>,
        fetcher: Arc<dyn PageTextFetcher>,
    ) -> Self {
        ChattingOrchestrator {
            store,
            registry,
            fetcher,
        }
    }

    pub fn available_models(&self) -> Vec<&'static str> {
        self.registry.all_models()
    }

    /// Resolve and credential-check the adapter serving `model`.
    pub async fn validate_adapter(&self, model: &str) -> Result<(), ChatError> {
        let adapter = self
            .registry
            .resolve(model)
            .ok_or(ChatError::InvalidConfig)?;
        adapter
            .validate_config()
            .await
            .map_err(|err| ChatError::Validating(err.to_string()))
    }

    /// Blocking send: user turn in, final assistant turn out.
    ///
    /// On vendor failure the error is surfaced to the caller and no
    /// partial assistant message is persisted.
    pub async fn send(&self, chat: &Chat, input: &str) -> Result<Vec<Message>, ChatError> {
        let mut user = Message::user(chat.id, input);
        user.processed_content = process_input(self.fetcher.as_ref(), chat, input).await?;
        self.store
            .create_message(user.clone())
            .await
            .map_err(store_err)?;
        self.store.persist().await.map_err(store_err)?;

        let adapter = self
            .registry
            .resolve(&chat.model)
            .ok_or(ChatError::InvalidConfig)?;

        let history = self
            .store
            .messages_for_chat(chat.id)
            .await
            .map_err(store_err)?;
        let turns = adapter.assemble_context(chat, &history, None);

        let text = adapter
            .send_blocking(&turns, &chat.model, chat.temperature)
            .await
            .map_err(|err| ChatError::Sending(err.to_string()))?;

        let assistant = Message::assistant(chat.id, text);
        self.store
            .create_message(assistant.clone())
            .await
            .map_err(store_err)?;
        self.store.persist().await.map_err(store_err)?;

        Ok(vec![user, assistant])
    }

    /// Streaming send.
    ///
    /// The user turn and the receiving placeholder are persisted as one
    /// unit before the exchange starts, so a crash mid-stream leaves a
    /// recoverable stuck-receiving message rather than a lost request.
    /// With `wait_for_completion` false the exchange runs detached and the
    /// placeholder is returned immediately for optimistic UI; the exchange
    /// outlives the caller and keeps persisting deltas.
    pub async fn send_with_stream(
        &self,
        chat: &Chat,
        input: &str,
        wait_for_completion: bool,
    ) -> Result<Message, ChatError> {
        let adapter = self
            .registry
            .resolve(&chat.model)
            .ok_or(ChatError::InvalidConfig)?;

        let mut user = Message::user(chat.id, input);
        user.processed_content = process_input(self.fetcher.as_ref(), chat, input).await?;
        let receiving = Message::receiving(chat.id);

        self.store
            .create_message(user.clone())
            .await
            .map_err(store_err)?;
        self.store
            .create_message(receiving.clone())
            .await
            .map_err(store_err)?;
        self.store.persist().await.map_err(store_err)?;

        let history = self
            .store
            .messages_for_chat(chat.id)
            .await
            .map_err(store_err)?;
        let receiving_index = history.iter().position(|m| m.id == receiving.id);
        let turns = adapter.assemble_context(chat, &history, receiving_index);

        let handle = self.spawn_stream_exchange(
            adapter,
            turns,
            chat.model.clone(),
            chat.temperature,
            receiving.clone(),
        );

        if wait_for_completion {
            handle
                .await
                .map_err(|err| ChatError::Sending(format!("streaming task failed: {err}")))
        } else {
            Ok(receiving)
        }
    }

    /// Retry a failed response in place.
    ///
    /// The target keeps its identity: prior content and failure are
    /// cleared, `receiving` is re-armed, and the same assembly/streaming
    /// flow runs against it. No duplicate message is created.
    pub async fn resend_with_stream(
        &self,
        chat: &Chat,
        message: &Message,
        wait_for_completion: bool,
    ) -> Result<Message, ChatError> {
        if message.role != Role::Assistant || message.chat_id != chat.id {
            return Err(ChatError::Sending(
                "only an assistant message of this chat can be resent".to_string(),
            ));
        }
        let adapter = self
            .registry
            .resolve(&chat.model)
            .ok_or(ChatError::InvalidConfig)?;

        let mut target = self
            .store
            .message(message.id)
            .await
            .map_err(store_err)?;
        target.clear_for_retry();
        self.store
            .update_message(target.clone())
            .await
            .map_err(store_err)?;
        self.store.persist().await.map_err(store_err)?;

        let history = self
            .store
            .messages_for_chat(chat.id)
            .await
            .map_err(store_err)?;
        let receiving_index = history.iter().position(|m| m.id == target.id);
        let turns = adapter.assemble_context(chat, &history, receiving_index);

        let handle = self.spawn_stream_exchange(
            adapter,
            turns,
            chat.model.clone(),
            chat.temperature,
            target.clone(),
        );

        if wait_for_completion {
            handle
                .await
                .map_err(|err| ChatError::Sending(format!("streaming task failed: {err}")))
        } else {
            Ok(target)
        }
    }

    /// Run one streaming exchange as a detached task.
    ///
    /// Deltas are applied and persisted strictly in channel order; the
    /// terminal outcome finalizes or fails the message. The task's
    /// lifetime is independent of the caller's.
    fn spawn_stream_exchange(
        &self,
        adapter: Arc<dyn ChattingAdapter>,
        turns: Vec<Turn>,
        model: String,
        temperature: Temperature,
        message: Message,
    ) -> JoinHandle<Message> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let (tx, rx) = mpsc::channel(64);
            let fallback = message.clone();
            let apply = tokio::spawn(apply_deltas(Arc::clone(&store), message, rx));

            let result = adapter.send_streaming(&turns, &model, temperature, tx).await;

            let mut message = match apply.await {
                Ok(message) => message,
                Err(err) => {
                    tracing::error!("delta application task failed: {err}");
                    fallback
                }
            };

            match result {
                Ok(()) => {
                    let final_text = message.content.take().unwrap_or_default();
                    tracing::info!(
                        message_id = %message.id,
                        chars = final_text.len(),
                        "streaming response finalized"
                    );
                    message.finalize(final_text);
                }
                Err(err) => {
                    let reason = err.failed_reason();
                    tracing::warn!(
                        message_id = %message.id,
                        reason = %reason,
                        "streaming response failed: {err}"
                    );
                    message.fail(reason);
                }
            }

            if let Err(err) = store.update_message(message.clone()).await {
                tracing::error!(message_id = %message.id, "failed to persist terminal state: {err}");
            }
            if let Err(err) = store.persist().await {
                tracing::error!(message_id = %message.id, "failed to flush terminal state: {err}");
            }
            message
        })
    }
}

/// Apply deltas to the receiving message, persisting each one before the
/// next is taken, so any reader sees a consistent snapshot.
async fn apply_deltas(
    store: Arc<dyn MessageStore>,
    mut message: Message,
    mut rx: mpsc::Receiver<StreamDelta>,
) -> Message {
    let mut accumulated = String::new();
    while let Some(delta) = rx.recv().await {
        delta.apply_to(&mut accumulated);
        message.content = Some(accumulated.clone());
        if let Err(err) = store.update_message(message.clone()).await {
            tracing::error!(message_id = %message.id, "failed to persist delta: {err}");
        }
        if let Err(err) = store.persist().await {
            tracing::error!(message_id = %message.id, "failed to flush delta: {err}");
        }
    }
    message
}
