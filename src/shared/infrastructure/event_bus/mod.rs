use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("failed to publish event: {0}")]
    PublishEventFailed(String),
}

/// Broker publisher. No ordering guarantee is assumed by callers.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), PublishError>;
}

pub mod in_memory;
pub mod pulsar;
