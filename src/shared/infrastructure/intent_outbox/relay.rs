//! Background delivery of staged outbox entries to the broker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::shared::infrastructure::event_bus::EventPublisher;
use crate::shared::infrastructure::intent_outbox::{OutboxError, OutboxStore};

/// Relay tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Pause between cycles. Failed entries wait this long before their next attempt.
    /// Default: 5 seconds.
    pub poll_interval: Duration,

    /// Maximum entries fetched per cycle. Default: 50.
    pub batch_size: usize,

    /// Failed attempts after which an entry is dead-lettered. Default: 5.
    pub max_retries: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 50,
            max_retries: 5,
        }
    }
}

/// Outcome of one relay cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub fetched: usize,
    pub published: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// Drains the outbox into the broker.
///
/// Runs as a single instance per deployment. There is no claim step, so two
/// relays polling the same outbox would publish the same entries twice.
///
/// Each cycle:
/// 1. Fetch up to `batch_size` deliverable entries, oldest first
/// 2. Publish each one with its event type as routing key
/// 3. Mark it processed, or bump its retry counter on failure
///
/// A failed entry is not retried within the same cycle. The fetch predicate is
/// the only cursor, so a restart loses nothing.
pub struct OutboxRelay<TOutbox, TPublisher>
where
    TOutbox: OutboxStore + ?Sized,
    TPublisher: EventPublisher + ?Sized,
{
    outbox: Arc<TOutbox>,
    publisher: Arc<TPublisher>,
    config: RelayConfig,
}

impl<TOutbox, TPublisher> OutboxRelay<TOutbox, TPublisher>
where
    TOutbox: OutboxStore + ?Sized,
    TPublisher: EventPublisher + ?Sized,
{
    pub fn new(outbox: Arc<TOutbox>, publisher: Arc<TPublisher>, config: RelayConfig) -> Self {
        Self {
            outbox,
            publisher,
            config,
        }
    }

    /// Run until the shutdown receiver flips to `true`.
    ///
    /// The signal also interrupts a cycle in progress, including a publish that
    /// has not returned yet. The interrupted entry is left untouched.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_retries = self.config.max_retries,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            match self.cycle(Some(&shutdown)).await {
                Ok(report) if report.fetched > 0 => info!(
                    fetched = report.fetched,
                    published = report.published,
                    failed = report.failed,
                    dead_lettered = report.dead_lettered,
                    "Outbox relay cycle finished"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Outbox relay cycle skipped"),
            }
        }

        info!("Outbox relay shutting down");
    }

    /// Run a single cycle.
    pub async fn run_once(&self) -> Result<RelayReport, OutboxError> {
        self.cycle(None).await
    }

    async fn cycle(
        &self,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<RelayReport, OutboxError> {
        let entries = self
            .outbox
            .get_unprocessed(self.config.batch_size, self.config.max_retries)
            .await?;

        let mut report = RelayReport {
            fetched: entries.len(),
            ..RelayReport::default()
        };

        for entry in entries {
            if shutdown.is_some_and(|signal| *signal.borrow()) {
                debug!("Shutdown requested, leaving remaining entries for the next run");
                break;
            }

            let publish = self.publisher.publish(&entry.event_type, &entry.payload);
            let outcome = match shutdown {
                Some(signal) => tokio::select! {
                    outcome = publish => Some(outcome),
                    _ = stop_requested(signal.clone()) => None,
                },
                None => Some(publish.await),
            };
            let Some(outcome) = outcome else {
                debug!(
                    entry_id = %entry.id,
                    "Shutdown requested mid-publish, entry left for the next run"
                );
                break;
            };

            match outcome {
                Ok(()) => {
                    self.outbox.mark_processed(entry.id).await?;
                    report.published += 1;
                    debug!(
                        entry_id = %entry.id,
                        event_type = %entry.event_type,
                        "Outbox entry published"
                    );
                }
                Err(e) => {
                    let attempts = self.outbox.increment_retry(entry.id).await?;
                    report.failed += 1;
                    if attempts >= self.config.max_retries {
                        report.dead_lettered += 1;
                        warn!(
                            entry_id = %entry.id,
                            event_type = %entry.event_type,
                            error = %e,
                            attempts,
                            max_retries = self.config.max_retries,
                            "Outbox entry exceeded max retries, moving to dead letter"
                        );
                    } else {
                        warn!(
                            entry_id = %entry.id,
                            event_type = %entry.event_type,
                            error = %e,
                            attempts,
                            "Outbox entry failed to publish, will retry"
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Resolves once the flag reads `true` or the sender is gone.
async fn stop_requested(mut signal: watch::Receiver<bool>) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod outbox_relay_tests {
    use super::*;
    use crate::shared::infrastructure::event_bus::in_memory::InMemoryEventBus;
    use crate::shared::infrastructure::intent_outbox::OutboxEntry;
    use crate::shared::infrastructure::intent_outbox::in_memory::InMemoryOutbox;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    const MAX_RETRIES: u32 = 3;

    fn config() -> RelayConfig {
        RelayConfig {
            poll_interval: Duration::from_millis(10),
            batch_size: 50,
            max_retries: MAX_RETRIES,
        }
    }

    fn entry(payload: &[u8]) -> OutboxEntry {
        OutboxEntry::new(Uuid::now_v7(), "PaymentCompletedIntegrationEvent", payload.to_vec())
    }

    #[fixture]
    async fn before_each() -> (InMemoryOutbox, Vec<OutboxEntry>, OutboxEntry) {
        let outbox = InMemoryOutbox::new();
        let healthy = vec![entry(b"A"), entry(b"B"), entry(b"C")];
        let poisoned = entry(b"E");
        for e in &healthy {
            outbox.seed(e.clone()).await;
        }
        outbox.seed(poisoned.clone()).await;
        (outbox, healthy, poisoned)
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_publish_everything_except_the_failing_entry(
        #[future] before_each: (InMemoryOutbox, Vec<OutboxEntry>, OutboxEntry),
    ) {
        let (outbox, healthy, poisoned) = before_each.await;
        let outbox = Arc::new(outbox);
        let bus = Arc::new(InMemoryEventBus::rejecting(|_, payload| payload == b"E"));
        let relay = OutboxRelay::new(outbox.clone(), bus.clone(), config());

        let report = relay.run_once().await.unwrap();

        assert_eq!(
            report,
            RelayReport {
                fetched: 4,
                published: 3,
                failed: 1,
                dead_lettered: 0
            }
        );
        for e in &healthy {
            assert!(outbox.get(e.id).await.unwrap().processed);
        }
        let stored = outbox.get(poisoned.id).await.unwrap();
        assert!(!stored.processed);
        assert_eq!(stored.retry_count, 1);

        let remaining = outbox.get_unprocessed(50, MAX_RETRIES).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, poisoned.id);
        assert_eq!(bus.published().await.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_dead_letter_after_max_retries(
        #[future] before_each: (InMemoryOutbox, Vec<OutboxEntry>, OutboxEntry),
    ) {
        let (outbox, _, poisoned) = before_each.await;
        let outbox = Arc::new(outbox);
        let bus = Arc::new(InMemoryEventBus::rejecting(|_, payload| payload == b"E"));
        let relay = OutboxRelay::new(outbox.clone(), bus, config());

        let mut last = RelayReport::default();
        for _ in 0..MAX_RETRIES {
            last = relay.run_once().await.unwrap();
        }

        assert_eq!(last.dead_lettered, 1);
        assert!(outbox.get_unprocessed(50, MAX_RETRIES).await.unwrap().is_empty());
        let dead = outbox.dead_letters(MAX_RETRIES, 10).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, poisoned.id);
        assert_eq!(dead[0].retry_count, MAX_RETRIES);

        let next = relay.run_once().await.unwrap();
        assert_eq!(next, RelayReport::default());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_deliver_a_replayed_entry_once_the_broker_recovers(
        #[future] before_each: (InMemoryOutbox, Vec<OutboxEntry>, OutboxEntry),
    ) {
        let (outbox, _, poisoned) = before_each.await;
        let outbox = Arc::new(outbox);
        let mut bus = InMemoryEventBus::new();
        bus.toggle_offline();
        let offline = OutboxRelay::new(outbox.clone(), Arc::new(bus.clone()), config());
        for _ in 0..MAX_RETRIES {
            offline.run_once().await.unwrap();
        }
        assert_eq!(outbox.dead_letters(MAX_RETRIES, 10).await.unwrap().len(), 4);

        assert!(outbox.replay(poisoned.id).await.unwrap());
        bus.toggle_offline();
        let online = OutboxRelay::new(outbox.clone(), Arc::new(bus.clone()), config());
        let report = online.run_once().await.unwrap();

        assert_eq!(report.published, 1);
        assert!(outbox.get(poisoned.id).await.unwrap().processed);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_surface_storage_failures_for_the_cycle() {
        let mut outbox = InMemoryOutbox::new();
        outbox.seed(entry(b"A")).await;
        outbox.toggle_offline();
        let relay = OutboxRelay::new(Arc::new(outbox), Arc::new(InMemoryEventBus::new()), config());

        assert!(matches!(relay.run_once().await, Err(OutboxError::Backend(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_stop_when_shutdown_is_signalled(
        #[future] before_each: (InMemoryOutbox, Vec<OutboxEntry>, OutboxEntry),
    ) {
        let (outbox, healthy, _) = before_each.await;
        let outbox = Arc::new(outbox);
        let bus = Arc::new(InMemoryEventBus::new());
        let relay = OutboxRelay::new(outbox.clone(), bus.clone(), config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(relay.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("relay did not stop")
            .unwrap();
        assert!(outbox.get(healthy[0].id).await.unwrap().processed);
    }

    struct HangingPublisher;

    #[async_trait::async_trait]
    impl EventPublisher for HangingPublisher {
        async fn publish(
            &self,
            _routing_key: &str,
            _payload: &[u8],
        ) -> Result<(), crate::shared::infrastructure::event_bus::PublishError> {
            std::future::pending().await
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_stop_while_a_publish_is_hanging() {
        let outbox = Arc::new(InMemoryOutbox::new());
        let stuck = entry(b"A");
        outbox.seed(stuck.clone()).await;
        let relay = OutboxRelay::new(outbox.clone(), Arc::new(HangingPublisher), config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(relay.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("relay did not stop while a publish was hanging")
            .unwrap();
        let stored = outbox.get(stuck.id).await.unwrap();
        assert!(!stored.processed);
        assert_eq!(stored.retry_count, 0);
    }
}
