//! Conversation state management module
//!
//! Provides in-memory conversation handling with:
//! - Concurrent store (DashMap) with LRU capacity and idle expiry
//! - Per-conversation serialization of message turns
//! - Classified failures from the model collaborator

pub mod error;
pub mod orchestrator;
pub mod store;
pub mod types;

pub use error::{ChatError, ErrorKind, ProviderError, DEFAULT_USER_MESSAGE};
pub use orchestrator::{ConversationOrchestrator, ModelProvider, ModelReply};
pub use store::{ConversationGuard, ConversationStore};
pub use types::{Conversation, StoreStats};

// Re-export common types for convenience, ChatMessage/ConversationId live in models
pub use crate::models::chat::{ChatMessage, ConversationId};
