use crate::modules::payments::adapters::outbound::payment_store::{
    PaymentStore, PaymentTransaction, StoreError,
};
use crate::modules::payments::core::events::PaymentEvent;
use crate::modules::payments::core::integration_events::{
    IntegrationEvent, PaymentCompletedIntegrationEvent, PaymentFailedIntegrationEvent,
};
use crate::modules::payments::core::payment::Payment;
use crate::modules::payments::core::state::PaymentStatus;
use crate::shared::infrastructure::intent_outbox::{OutboxEntry, OutboxError, OutboxWriter};
use tracing::{debug, warn};
use uuid::Uuid;

/// Map a domain event to the integration message other services receive.
/// `PaymentCreated` stays in-process.
pub fn translate(event: &PaymentEvent) -> Option<IntegrationEvent> {
    match event {
        PaymentEvent::PaymentCreated(_) => None,
        PaymentEvent::PaymentCompleted(e) => Some(IntegrationEvent::PaymentCompleted(
            PaymentCompletedIntegrationEvent {
                payment_id: e.payment_id,
                appointment_id: e.appointment_id,
                status: PaymentStatus::Completed.to_string(),
                transaction_id: e.transaction_id.clone(),
            },
        )),
        PaymentEvent::PaymentFailed(e) => Some(IntegrationEvent::PaymentFailed(
            PaymentFailedIntegrationEvent {
                payment_id: e.payment_id,
                appointment_id: e.appointment_id,
                reason: e.reason.clone(),
            },
        )),
    }
}

/// Stage the externally significant `events` inside the already open transaction `tx`.
/// Returns the number of entries written.
pub async fn save_events(
    tx: &mut impl OutboxWriter,
    aggregate_id: Uuid,
    events: &[PaymentEvent],
) -> Result<usize, OutboxError> {
    let mut written = 0;
    for event in events {
        let Some(message) = translate(event) else {
            continue;
        };
        let payload = message
            .to_payload()
            .map_err(|err| OutboxError::Serialization(err.to_string()))?;
        tx.insert_outbox_entry(OutboxEntry::new(aggregate_id, message.event_type(), payload))
            .await?;
        debug!(
            payment_id = %event.payment_id(),
            event = event.name(),
            event_type = message.event_type(),
            "staged outbox entry"
        );
        written += 1;
    }
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Insert,
    Update,
}

/// Write the payment row and its staged events in one transaction.
///
/// Staged events are drained only after the commit succeeds. On any failure
/// the transaction is rolled back and the aggregate keeps its events.
pub async fn persist_with_outbox<TStore>(
    store: &TStore,
    payment: &mut Payment,
    write: Write,
) -> Result<Vec<PaymentEvent>, StoreError>
where
    TStore: PaymentStore,
{
    let mut tx = store.begin().await?;
    match stage(&mut tx, payment, write).await {
        Ok(staged) => {
            tx.commit().await?;
            payment.advance_version();
            debug!(
                payment_id = %payment.id(),
                outbox_entries = staged,
                "payment persisted"
            );
            Ok(payment.drain_events())
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    payment_id = %payment.id(),
                    error = %rollback_err,
                    "rollback failed"
                );
            }
            Err(err)
        }
    }
}

async fn stage<TTx>(tx: &mut TTx, payment: &Payment, write: Write) -> Result<usize, StoreError>
where
    TTx: PaymentTransaction,
{
    match write {
        Write::Insert => tx.insert_payment(payment).await?,
        Write::Update => tx.update_payment(payment).await?,
    }
    Ok(save_events(tx, payment.id(), payment.pending_events()).await?)
}

#[cfg(test)]
mod payment_intent_outbox_tests {
    use super::*;
    use crate::modules::payments::adapters::outbound::payment_store_in_memory::InMemoryPaymentStore;
    use crate::modules::payments::core::events::PaymentCompleted;
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;

    #[fixture]
    fn before_each() -> (InMemoryPaymentStore, Payment) {
        let payment =
            Payment::create(Uuid::now_v7(), "user-1", Decimal::new(5000, 2), "usd").unwrap();
        (InMemoryPaymentStore::new(), payment)
    }

    #[rstest]
    fn it_should_keep_created_events_in_process(before_each: (InMemoryPaymentStore, Payment)) {
        let (_, payment) = before_each;
        assert!(translate(&payment.pending_events()[0]).is_none());
    }

    #[rstest]
    fn it_should_translate_a_completion_into_a_self_contained_message() {
        let payment_id = Uuid::now_v7();
        let appointment_id = Uuid::now_v7();
        let event = PaymentEvent::PaymentCompleted(PaymentCompleted {
            payment_id,
            appointment_id,
            transaction_id: "pi_123".into(),
            occurred_at: Utc::now(),
        });

        let message = translate(&event).unwrap();
        assert_eq!(message.event_type(), "PaymentCompletedIntegrationEvent");

        let payload: serde_json::Value =
            serde_json::from_slice(&message.to_payload().unwrap()).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "paymentId": payment_id,
                "appointmentId": appointment_id,
                "status": "Completed",
                "transactionId": "pi_123",
            })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_persist_the_row_and_drain_after_commit(
        before_each: (InMemoryPaymentStore, Payment),
    ) {
        let (store, mut payment) = before_each;
        let drained = persist_with_outbox(&store, &mut payment, Write::Insert).await.unwrap();

        assert_eq!(drained.len(), 1);
        assert!(payment.pending_events().is_empty());
        assert_eq!(payment.version(), 1);
        assert_eq!(store.payment_count().await, 1);
        assert!(store.outbox_entries().await.is_empty());

        payment.mark_failed("card_declined").unwrap();
        persist_with_outbox(&store, &mut payment, Write::Update).await.unwrap();

        let entries = store.outbox_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, "PaymentFailedIntegrationEvent");
        assert_eq!(entries[0].aggregate_id, payment.id());
        assert_eq!(entries[0].retry_count, 0);
        assert!(!entries[0].processed);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_keep_events_and_write_nothing_when_the_outbox_insert_fails(
        before_each: (InMemoryPaymentStore, Payment),
    ) {
        let (mut store, mut payment) = before_each;
        payment.mark_completed().unwrap();
        store.toggle_failing_outbox_writes();

        let result = persist_with_outbox(&store, &mut payment, Write::Insert).await;

        assert!(matches!(result, Err(StoreError::Outbox(OutboxError::Backend(_)))));
        assert_eq!(payment.pending_events().len(), 2);
        assert_eq!(payment.version(), 0);
        assert_eq!(store.payment_count().await, 0);
        assert!(store.outbox_entries().await.is_empty());
    }
}
