use std::time::Duration;
use tokio::time::Instant;

use crate::models::chat::ChatMessage;

/// Conversation state stored in memory
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Message history, replaced wholesale after every successful turn
    pub history: Vec<ChatMessage>,

    /// Language hint fixed when the conversation started
    pub language: String,

    /// Creation time
    pub created_at: Instant,

    /// Last read or write (drives LRU and idle expiry)
    pub last_access: Instant,
}

impl Conversation {
    pub fn new(history: Vec<ChatMessage>, language: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            history,
            language: language.into(),
            created_at: now,
            last_access: now,
        }
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Idle longer than `ttl`
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.last_access.elapsed() > ttl,
            None => false,
        }
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub active_conversations: usize,
    pub capacity: Option<usize>,
    pub evictions: u64,
    pub expirations: u64,
}
