use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// One staged integration message.
///
/// Written in the same transaction as the aggregate row it belongs to. Only the
/// relay mutates it afterwards, and once `processed` is set it is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

impl OutboxEntry {
    pub fn new(aggregate_id: Uuid, event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::now_v7(),
            aggregate_id,
            event_type: event_type.into(),
            payload,
            processed: false,
            created_at: Utc::now(),
            processed_at: None,
            retry_count: 0,
        }
    }

    /// Unprocessed and still below the retry threshold.
    pub fn is_deliverable(&self, max_retries: u32) -> bool {
        !self.processed && self.retry_count < max_retries
    }

    /// Unprocessed and out of retries.
    pub fn is_dead_lettered(&self, max_retries: u32) -> bool {
        !self.processed && self.retry_count >= max_retries
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutboxError {
    #[error("outbox entry {0} not found")]
    NotFound(Uuid),

    #[error("failed to serialize outbox payload: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Write side of the outbox, implemented by an open storage transaction.
#[async_trait]
pub trait OutboxWriter: Send {
    async fn insert_outbox_entry(&mut self, entry: OutboxEntry) -> Result<(), OutboxError>;
}

/// Relay side of the outbox. Every operation is a single-row update or a read.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Up to `limit` deliverable entries, oldest first.
    async fn get_unprocessed(
        &self,
        limit: usize,
        max_retries: u32,
    ) -> Result<Vec<OutboxEntry>, OutboxError>;

    async fn mark_processed(&self, id: Uuid) -> Result<(), OutboxError>;

    /// Returns the retry count after the increment.
    async fn increment_retry(&self, id: Uuid) -> Result<u32, OutboxError>;

    /// Up to `limit` exhausted entries, oldest first.
    async fn dead_letters(
        &self,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<OutboxEntry>, OutboxError>;

    /// Resets the retry counter so the relay picks the entry up again.
    /// Returns `false` when the entry was already processed.
    async fn replay(&self, id: Uuid) -> Result<bool, OutboxError>;
}

pub mod in_memory;
pub mod relay;
