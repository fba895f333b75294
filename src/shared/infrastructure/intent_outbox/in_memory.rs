use crate::shared::infrastructure::intent_outbox::{OutboxEntry, OutboxError, OutboxStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outbox rows kept in insertion order, which is also creation order.
///
/// Storage adapters embed this next to their own tables so outbox rows can be
/// written under the same lock as the aggregate row.
#[derive(Debug, Default, Clone)]
pub struct OutboxTable {
    rows: Vec<OutboxEntry>,
}

impl OutboxTable {
    pub fn insert(&mut self, entry: OutboxEntry) {
        self.rows.push(entry);
    }

    pub fn rows(&self) -> &[OutboxEntry] {
        &self.rows
    }

    pub fn unprocessed(&self, limit: usize, max_retries: u32) -> Vec<OutboxEntry> {
        self.oldest_first(limit, |row| row.is_deliverable(max_retries))
    }

    pub fn dead_letters(&self, max_retries: u32, limit: usize) -> Vec<OutboxEntry> {
        self.oldest_first(limit, |row| row.is_dead_lettered(max_retries))
    }

    pub fn mark_processed(&mut self, id: Uuid) -> Result<(), OutboxError> {
        let row = self.find_mut(id)?;
        if !row.processed {
            row.processed = true;
            row.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn increment_retry(&mut self, id: Uuid) -> Result<u32, OutboxError> {
        let row = self.find_mut(id)?;
        if !row.processed {
            row.retry_count += 1;
        }
        Ok(row.retry_count)
    }

    pub fn replay(&mut self, id: Uuid) -> Result<bool, OutboxError> {
        let row = self.find_mut(id)?;
        if row.processed {
            return Ok(false);
        }
        row.retry_count = 0;
        Ok(true)
    }

    fn oldest_first(&self, limit: usize, keep: impl Fn(&OutboxEntry) -> bool) -> Vec<OutboxEntry> {
        let mut rows: Vec<OutboxEntry> =
            self.rows.iter().filter(|row| keep(row)).cloned().collect();
        rows.sort_by_key(|row| row.created_at);
        rows.truncate(limit);
        rows
    }

    fn find_mut(&mut self, id: Uuid) -> Result<&mut OutboxEntry, OutboxError> {
        self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(OutboxError::NotFound(id))
    }
}

/// Standalone in-memory outbox for the relay and local development.
#[derive(Clone, Default)]
pub struct InMemoryOutbox {
    table: Arc<RwLock<OutboxTable>>,
    is_offline: bool,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn seed(&self, entry: OutboxEntry) {
        self.table.write().await.insert(entry);
    }

    pub async fn get(&self, id: Uuid) -> Option<OutboxEntry> {
        self.table
            .read()
            .await
            .rows()
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    fn ensure_online(&self) -> Result<(), OutboxError> {
        if self.is_offline {
            return Err(OutboxError::Backend("Outbox offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutbox {
    async fn get_unprocessed(
        &self,
        limit: usize,
        max_retries: u32,
    ) -> Result<Vec<OutboxEntry>, OutboxError> {
        self.ensure_online()?;
        Ok(self.table.read().await.unprocessed(limit, max_retries))
    }

    async fn mark_processed(&self, id: Uuid) -> Result<(), OutboxError> {
        self.ensure_online()?;
        self.table.write().await.mark_processed(id)
    }

    async fn increment_retry(&self, id: Uuid) -> Result<u32, OutboxError> {
        self.ensure_online()?;
        self.table.write().await.increment_retry(id)
    }

    async fn dead_letters(
        &self,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<OutboxEntry>, OutboxError> {
        self.ensure_online()?;
        Ok(self.table.read().await.dead_letters(max_retries, limit))
    }

    async fn replay(&self, id: Uuid) -> Result<bool, OutboxError> {
        self.ensure_online()?;
        self.table.write().await.replay(id)
    }
}
