//! context_manager - Bounded context assembly for outbound requests
//!
//! Walks a chat's message history backwards under a token budget and
//! produces the ordered turn sequence an adapter transmits.

pub mod assembler;
pub mod token_counter;

pub use assembler::{ContextAssembler, Turn};
pub use token_counter::TokenCounter;
