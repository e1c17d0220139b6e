use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    MessageId, OutboxError, OutboxMessage, Result,
    store::{DueQuery, OutboxStore, validate_messages_for_append},
};

/// In-memory outbox store.
///
/// Clones share the same underlying messages, so the command side and the
/// processor can each hold a handle.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    messages: Arc<RwLock<Vec<OutboxMessage>>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored messages.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Inserts a message as-is, bypassing freshness validation.
    ///
    /// Lets tests seed messages that already carry retries or failures.
    pub async fn seed(&self, message: OutboxMessage) {
        self.messages.write().await.push(message);
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn append(&self, messages: Vec<OutboxMessage>) -> Result<()> {
        validate_messages_for_append(&messages)?;

        let mut store = self.messages.write().await;
        if let Some(existing) = messages
            .iter()
            .find(|m| store.iter().any(|stored| stored.id == m.id))
        {
            return Err(OutboxError::DuplicateMessage(existing.id));
        }

        let count = messages.len();
        store.extend(messages);
        tracing::debug!(count, "outbox messages appended");
        Ok(())
    }

    async fn due_messages(&self, query: DueQuery) -> Result<Vec<OutboxMessage>> {
        let store = self.messages.read().await;
        let mut due: Vec<_> = store
            .iter()
            .filter(|m| m.is_due(query.max_retry_count))
            .cloned()
            .collect();

        // Stable sort keeps insertion order for equal timestamps.
        due.sort_by_key(|m| m.occurred_on);

        if let Some(limit) = query.limit {
            due.truncate(limit);
        }
        Ok(due)
    }

    async fn save_batch(&self, messages: Vec<OutboxMessage>) -> Result<()> {
        let mut store = self.messages.write().await;

        let positions: HashMap<MessageId, usize> = store
            .iter()
            .enumerate()
            .map(|(index, m)| (m.id, index))
            .collect();

        // Validate the whole batch before touching anything.
        let mut updates = Vec::with_capacity(messages.len());
        for message in messages {
            let index = *positions
                .get(&message.id)
                .ok_or(OutboxError::MessageNotFound(message.id))?;
            if store[index].is_processed() {
                return Err(OutboxError::AlreadyProcessed(message.id));
            }
            updates.push((index, message));
        }

        for (index, message) in updates {
            store[index] = message;
        }
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let store = self.messages.read().await;
        Ok(store.iter().find(|m| m.id == id).cloned())
    }

    async fn all(&self) -> Result<Vec<OutboxMessage>> {
        let store = self.messages.read().await;
        let mut messages = store.clone();
        messages.sort_by_key(|m| m.occurred_on);
        Ok(messages)
    }
}
