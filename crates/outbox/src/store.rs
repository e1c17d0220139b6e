use std::collections::HashSet;

use async_trait::async_trait;

use crate::{MAX_RETRY_COUNT, MessageId, OutboxError, OutboxMessage, Result};

/// Selection criteria for a processor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueQuery {
    /// Messages with this many failed attempts or more are excluded.
    pub max_retry_count: u32,

    /// Maximum number of messages to return. `None` selects every due message.
    pub limit: Option<usize>,
}

impl DueQuery {
    pub fn new(max_retry_count: u32) -> Self {
        Self {
            max_retry_count,
            limit: None,
        }
    }

    /// Caps the number of selected messages.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Default for DueQuery {
    fn default() -> Self {
        Self::new(MAX_RETRY_COUNT)
    }
}

/// Durable storage for outbox messages.
///
/// Implementations must be thread-safe. Writers append fresh messages as part
/// of the originating transaction; the processor reads due messages and writes
/// back the outcome of a pass with a single `save_batch` call.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Appends fresh messages atomically: either all are stored or none are.
    async fn append(&self, messages: Vec<OutboxMessage>) -> Result<()>;

    /// Returns messages that are not processed and still below the retry limit,
    /// oldest `occurred_on` first.
    async fn due_messages(&self, query: DueQuery) -> Result<Vec<OutboxMessage>>;

    /// Persists the outcome of a processor pass in one commit.
    ///
    /// Fails without writing anything if a message is unknown or was already
    /// processed in the store.
    async fn save_batch(&self, messages: Vec<OutboxMessage>) -> Result<()>;

    /// Loads a single message.
    async fn get(&self, id: MessageId) -> Result<Option<OutboxMessage>>;

    /// Returns every stored message, oldest first.
    async fn all(&self) -> Result<Vec<OutboxMessage>>;
}

/// Convenience methods available on every outbox store.
#[async_trait]
pub trait OutboxStoreExt: OutboxStore {
    /// Appends a single message.
    async fn append_one(&self, message: OutboxMessage) -> Result<()> {
        self.append(vec![message]).await
    }

    /// Messages that exhausted their retries without being dispatched.
    async fn dead_letters(&self, max_retry_count: u32) -> Result<Vec<OutboxMessage>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|m| m.is_dead_letter(max_retry_count))
            .collect())
    }
}

impl<T: OutboxStore + ?Sized> OutboxStoreExt for T {}

/// Checks that messages are fresh and carry distinct ids before they are appended.
pub fn validate_messages_for_append(messages: &[OutboxMessage]) -> Result<()> {
    let mut seen = HashSet::with_capacity(messages.len());
    for message in messages {
        if message.message_type.trim().is_empty() {
            return Err(OutboxError::InvalidMessage(format!(
                "message {} has an empty type",
                message.id
            )));
        }
        if message.processed_on.is_some() || message.retry_count != 0 || message.error.is_some()
        {
            return Err(OutboxError::InvalidMessage(format!(
                "message {} is not fresh",
                message.id
            )));
        }
        if !seen.insert(message.id) {
            return Err(OutboxError::DuplicateMessage(message.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn due_query_defaults_to_max_retry_count() {
        let query = DueQuery::default();
        assert_eq!(query.max_retry_count, MAX_RETRY_COUNT);
        assert_eq!(query.limit, None);
        assert_eq!(DueQuery::new(3).limit(10).limit, Some(10));
    }

    #[test]
    fn validation_accepts_fresh_messages() {
        let messages = vec![
            OutboxMessage::new("A", "{}", Utc::now()),
            OutboxMessage::new("B", "{}", Utc::now()),
        ];
        assert!(validate_messages_for_append(&messages).is_ok());
        assert!(validate_messages_for_append(&[]).is_ok());
    }

    #[test]
    fn validation_rejects_duplicate_ids() {
        let message = OutboxMessage::new("A", "{}", Utc::now());
        let result = validate_messages_for_append(&[message.clone(), message]);
        assert!(matches!(result, Err(OutboxError::DuplicateMessage(_))));
    }

    #[test]
    fn validation_rejects_processed_messages() {
        let mut message = OutboxMessage::new("A", "{}", Utc::now());
        message.mark_processed(Utc::now()).unwrap();
        let result = validate_messages_for_append(&[message]);
        assert!(matches!(result, Err(OutboxError::InvalidMessage(_))));
    }

    #[test]
    fn validation_rejects_blank_type() {
        let message = OutboxMessage::new("  ", "{}", Utc::now());
        let result = validate_messages_for_append(&[message]);
        assert!(matches!(result, Err(OutboxError::InvalidMessage(_))));
    }
}
