//! chat_core - Core types for the chat system
//!
//! This crate provides the foundational types used across all chat-related crates:
//! - `chat` - Chat configuration (model, temperature, system prompt)
//! - `message` - Message lifecycle and failure taxonomy
//! - `config` - Explicit adapter settings (file + environment)
//! - `error` - Shared error taxonomy surfaced to callers

pub mod chat;
pub mod config;
pub mod error;
pub mod message;

// Re-export commonly used types
pub use chat::{Chat, Temperature};
pub use config::{AdapterSettings, ProxyAuth, Settings};
pub use error::{ChatError, Result};
pub use message::{FailedReason, Message, Role};
