//! storage_manager - Message persistence collaborator
//!
//! The orchestrator treats the store as its only shared mutable resource:
//! every message mutation is written back through `update_message` and made
//! durable with `persist` before the mutation counts. Readers observe a
//! consistent snapshot at any point in a streaming session.

pub mod memory_store;

use async_trait::async_trait;
use chat_core::Message;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use memory_store::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Message not found: {0}")]
    NotFound(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    Created,
    Updated,
    Deleted,
}

/// Change notification emitted after a mutation is applied.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub kind: StoreEventKind,
}

/// Message store operations.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a new message.
    async fn create_message(&self, message: Message) -> Result<()>;

    /// Replace a stored message by id.
    async fn update_message(&self, message: Message) -> Result<()>;

    /// Remove messages by id; unknown ids are ignored.
    async fn delete_messages(&self, ids: &[Uuid]) -> Result<()>;

    /// Flush pending writes to durable storage.
    async fn persist(&self) -> Result<()>;

    /// A chat's messages ordered by creation timestamp.
    async fn messages_for_chat(&self, chat_id: Uuid) -> Result<Vec<Message>>;

    /// Fetch a single message by id.
    async fn message(&self, id: Uuid) -> Result<Message>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
