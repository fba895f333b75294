use crate::shared::infrastructure::event_bus::{EventPublisher, PublishError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

const SUBSCRIBER_BUFFER: usize = 64;
const PUBLISHED_HISTORY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub routing_key: String,
    pub payload: Vec<u8>,
}

type RejectFn = dyn Fn(&str, &[u8]) -> bool + Send + Sync;

/// In-process broker used in development and tests.
///
/// Forwards every accepted message to subscribers of its routing key and keeps
/// the most recent ones for inspection. Older messages are dropped once the
/// history is full.
#[derive(Clone)]
pub struct InMemoryEventBus {
    published: Arc<Mutex<VecDeque<PublishedMessage>>>,
    history: usize,
    subscribers: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>>,
    reject: Option<Arc<RejectFn>>,
    is_offline: bool,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self {
            published: Arc::default(),
            history: PUBLISHED_HISTORY,
            subscribers: Arc::default(),
            reject: None,
            is_offline: false,
        }
    }
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `history` published messages.
    pub fn with_history(history: usize) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    /// Makes `publish` fail for every message matching `predicate`.
    pub fn rejecting(predicate: impl Fn(&str, &[u8]) -> bool + Send + Sync + 'static) -> Self {
        Self {
            reject: Some(Arc::new(predicate)),
            ..Self::default()
        }
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.iter().cloned().collect()
    }

    pub async fn subscribe(&self, routing_key: &str) -> mpsc::Receiver<Vec<u8>> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers
            .lock()
            .await
            .entry(routing_key.to_string())
            .or_default()
            .push(sender);
        receiver
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.is_offline {
            return Err(PublishError::PublishEventFailed("Event bus offline".into()));
        }
        if self
            .reject
            .as_ref()
            .is_some_and(|reject| reject(routing_key, payload))
        {
            return Err(PublishError::PublishEventFailed(format!(
                "message on {routing_key} rejected"
            )));
        }

        if self.history > 0 {
            let mut published = self.published.lock().await;
            if published.len() >= self.history {
                published.pop_front();
            }
            published.push_back(PublishedMessage {
                routing_key: routing_key.to_string(),
                payload: payload.to_vec(),
            });
        }

        let senders = self
            .subscribers
            .lock()
            .await
            .get(routing_key)
            .cloned()
            .unwrap_or_default();
        for sender in senders {
            if sender.send(payload.to_vec()).await.is_err() {
                debug!(routing_key, "subscriber dropped, skipping delivery");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod in_memory_event_bus_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn it_should_record_and_deliver_published_messages() {
        let bus = InMemoryEventBus::new();
        let mut receiver = bus.subscribe("topic-a").await;

        bus.publish("topic-a", b"hello").await.unwrap();
        bus.publish("topic-b", b"ignored").await.unwrap();

        assert_eq!(receiver.recv().await, Some(b"hello".to_vec()));
        assert!(receiver.try_recv().is_err());
        assert_eq!(bus.published().await.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_matching_messages() {
        let bus = InMemoryEventBus::rejecting(|_, payload| payload == b"bad");
        assert!(bus.publish("topic", b"good").await.is_ok());
        assert!(matches!(
            bus.publish("topic", b"bad").await,
            Err(PublishError::PublishEventFailed(_))
        ));
        assert_eq!(bus.published().await.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_when_offline() {
        let mut bus = InMemoryEventBus::new();
        bus.toggle_offline();
        assert!(bus.publish("topic", b"x").await.is_err());
        assert!(bus.published().await.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_keep_only_the_most_recent_messages() {
        let bus = InMemoryEventBus::with_history(2);
        let mut receiver = bus.subscribe("topic").await;

        for payload in [b"1", b"2", b"3"] {
            bus.publish("topic", payload).await.unwrap();
        }

        let kept: Vec<Vec<u8>> = bus.published().await.into_iter().map(|m| m.payload).collect();
        assert_eq!(kept, vec![b"2".to_vec(), b"3".to_vec()]);
        assert_eq!(receiver.recv().await, Some(b"1".to_vec()));
    }
}
