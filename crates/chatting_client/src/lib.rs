//! chatting_client - Vendor adapters over chat completion APIs
//!
//! Normalizes two structurally different vendor protocols behind one
//! capability interface: OpenAI-style chat-message arrays and
//! Anthropic-style flattened prompts. Streaming responses arrive through a
//! shared SSE transport as typed deltas whose accumulation policy (append
//! vs. replace) belongs to the adapter that produced them.

pub mod adapter;
pub mod adapters;
pub mod delta;
pub mod error;
pub mod http;
pub mod transport;

pub use adapter::{AdapterRegistry, ChattingAdapter};
pub use adapters::anthropic::AnthropicAdapter;
pub use adapters::openai::OpenAiAdapter;
pub use delta::StreamDelta;
pub use error::ClientError;
pub use transport::{EventStream, EventStreamRequest, OpenError, SseFrame, StreamItem, StreamTransport};
