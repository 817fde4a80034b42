use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::models::chat::ConversationId;
use super::types::{Conversation, StoreStats};

/// In-memory conversation store.
///
/// Bounded by `capacity` (least-recently-used entry is evicted when a new id
/// would exceed it) and by `idle_ttl` (entries idle longer are dropped lazily
/// on read and by [`ConversationStore::cleanup_expired`]). Mutations for one id
/// are serialized through [`ConversationStore::lock`].
pub struct ConversationStore {
    /// conversation_id -> Conversation
    storage: DashMap<ConversationId, Conversation>,

    /// conversation_id -> writer lock, only present while held or awaited
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,

    capacity: Option<usize>,
    idle_ttl: Option<Duration>,

    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Exclusive access to one conversation id. Released on drop.
pub struct ConversationGuard<'a> {
    store: &'a ConversationStore,
    id: ConversationId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Nobody else holds or waits on the mutex once only the map owns it
        self.store
            .locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl ConversationStore {
    pub fn new(capacity: Option<usize>, idle_ttl: Option<Duration>) -> Self {
        info!(
            "Initializing conversation store: capacity={:?}, idle_ttl={:?}",
            capacity, idle_ttl
        );
        Self {
            storage: DashMap::new(),
            locks: DashMap::new(),
            capacity: capacity.filter(|c| *c > 0),
            idle_ttl,
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Unbounded store without expiry
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// Get conversation by id, refreshing its recency.
    /// Returns None if absent or expired.
    pub fn get(&self, id: &str) -> Option<Conversation> {
        let mut entry = self.storage.get_mut(id)?;

        if entry.is_expired(self.idle_ttl) {
            drop(entry); // Release write lock
            self.remove_expired(id);
            debug!("Conversation {} expired, removed from store", id);
            return None;
        }

        entry.touch();
        Some(entry.value().clone())
    }

    /// Insert or replace a conversation
    pub fn put(&self, id: ConversationId, mut conversation: Conversation) {
        conversation.touch();

        if !self.storage.contains_key(&id) {
            self.make_room();
        }

        debug!(
            "Stored conversation {} ({} turns)",
            id,
            conversation.turn_count()
        );
        self.storage.insert(id, conversation);
    }

    /// Remove conversation from store
    pub fn remove(&self, id: &str) -> Option<Conversation> {
        self.storage.remove(id).map(|(_, conversation)| conversation)
    }

    /// Wait for exclusive access to `id`
    pub async fn lock(&self, id: &str) -> ConversationGuard<'_> {
        let mutex = self.locks.entry(id.to_string()).or_default().clone();
        let guard = mutex.lock_owned().await;

        ConversationGuard {
            store: self,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of stored conversations
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop idle conversations. Returns number removed.
    pub fn cleanup_expired(&self) -> usize {
        // Lock entries orphaned by cancelled waiters
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);

        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let start_len = self.storage.len();
        self.storage
            .retain(|_, conversation: &mut Conversation| !conversation.is_expired(Some(ttl)));
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            self.expirations.fetch_add(count as u64, Ordering::Relaxed);
            info!("Cleaned up {} expired conversations", count);
        }

        count
    }

    /// Periodic expiry sweep, runs until the task is dropped
    pub async fn run_sweeper(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.cleanup_expired();
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            active_conversations: self.len(),
            capacity: self.capacity,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn remove_expired(&self, id: &str) {
        let ttl = self.idle_ttl;
        if self
            .storage
            .remove_if(id, |_, conversation| conversation.is_expired(ttl))
            .is_some()
        {
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Evict least-recently-used entries until one more fits
    fn make_room(&self) {
        let Some(capacity) = self.capacity else {
            return;
        };

        while self.storage.len() >= capacity {
            let oldest = self
                .storage
                .iter()
                .min_by_key(|entry| entry.last_access)
                .map(|entry| entry.key().clone());

            let Some(key) = oldest else {
                break;
            };

            if self.storage.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("Evicted least recently used conversation {}", key);
            }
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::unbounded()
    }
}
