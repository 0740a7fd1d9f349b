//! In-memory reference store.

use std::collections::HashMap;

use async_trait::async_trait;
use chat_core::Message;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::{MessageStore, Result, StorageError, StoreEvent, StoreEventKind};

struct StoredMessage {
    message: Message,
    /// Tie-breaker for identical timestamps; insertion order wins.
    sequence: u64,
}

#[derive(Default)]
struct MemoryStoreState {
    messages: HashMap<Uuid, StoredMessage>,
    next_sequence: u64,
}

/// Message store backed by process memory.
///
/// `persist` is a flush point with nothing to flush; it exists so callers
/// exercise the same mutation-then-persist discipline a durable backend
/// needs.
pub struct MemoryStore {
    state: RwLock<MemoryStoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        MemoryStore {
            state: RwLock::new(MemoryStoreState::default()),
            events,
        }
    }

    fn notify(&self, chat_id: Uuid, message_id: Uuid, kind: StoreEventKind) {
        // Send fails only when nobody is subscribed.
        let _ = self.events.send(StoreEvent {
            chat_id,
            message_id,
            kind,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_message(&self, message: Message) -> Result<()> {
        let mut state = self.state.write().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let chat_id = message.chat_id;
        let message_id = message.id;
        state
            .messages
            .insert(message.id, StoredMessage { message, sequence });
        drop(state);

        tracing::debug!(%chat_id, %message_id, "message created");
        self.notify(chat_id, message_id, StoreEventKind::Created);
        Ok(())
    }

    async fn update_message(&self, message: Message) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .messages
            .get_mut(&message.id)
            .ok_or(StorageError::NotFound(message.id))?;
        let chat_id = message.chat_id;
        let message_id = message.id;
        stored.message = message;
        drop(state);

        self.notify(chat_id, message_id, StoreEventKind::Updated);
        Ok(())
    }

    async fn delete_messages(&self, ids: &[Uuid]) -> Result<()> {
        let mut state = self.state.write().await;
        let mut removed = Vec::new();
        for id in ids {
            if let Some(stored) = state.messages.remove(id) {
                removed.push((stored.message.chat_id, *id));
            }
        }
        drop(state);

        for (chat_id, message_id) in removed {
            self.notify(chat_id, message_id, StoreEventKind::Deleted);
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        tracing::trace!("persist flush point");
        Ok(())
    }

    async fn messages_for_chat(&self, chat_id: Uuid) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut stored: Vec<(&StoredMessage, u64)> = state
            .messages
            .values()
            .filter(|stored| stored.message.chat_id == chat_id)
            .map(|stored| (stored, stored.sequence))
            .collect();
        stored.sort_by(|a, b| {
            a.0.message
                .created_at
                .cmp(&b.0.message.created_at)
                .then(a.1.cmp(&b.1))
        });
        Ok(stored
            .into_iter()
            .map(|(stored, _)| stored.message.clone())
            .collect())
    }

    async fn message(&self, id: Uuid) -> Result<Message> {
        let state = self.state.read().await;
        state
            .messages
            .get(&id)
            .map(|stored| stored.message.clone())
            .ok_or(StorageError::NotFound(id))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
