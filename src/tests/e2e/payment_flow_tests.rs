use crate::modules::payments::adapters::outbound::payment_processor_in_memory::InMemoryPaymentProcessor;
use crate::modules::payments::adapters::outbound::payment_store::PaymentStore;
use crate::modules::payments::adapters::outbound::payment_store_in_memory::InMemoryPaymentStore;
use crate::modules::payments::core::integration_events::{
    PaymentCompletedIntegrationEvent, PaymentFailedIntegrationEvent,
};
use crate::modules::payments::core::state::PaymentStatus;
use crate::modules::payments::use_cases::complete_payment::command::CompletePayment;
use crate::modules::payments::use_cases::dispatch::{
    PaymentRequest, PaymentResponse, PaymentsDispatcher,
};
use crate::modules::payments::use_cases::errors::ApplicationError;
use crate::shared::infrastructure::event_bus::in_memory::InMemoryEventBus;
use crate::shared::infrastructure::intent_outbox::OutboxStore;
use crate::shared::infrastructure::intent_outbox::relay::{OutboxRelay, RelayConfig};
use crate::tests::fixtures::commands::create_payment::CreatePaymentBuilder;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

type Dispatcher = PaymentsDispatcher<InMemoryPaymentStore, InMemoryPaymentProcessor>;

fn dispatcher(
    store: &Arc<InMemoryPaymentStore>,
    processor: InMemoryPaymentProcessor,
) -> Dispatcher {
    PaymentsDispatcher::new(store.clone(), Arc::new(processor))
}

fn relay_config(max_retries: u32) -> RelayConfig {
    RelayConfig {
        max_retries,
        ..RelayConfig::default()
    }
}

async fn create(payments: &Dispatcher, appointment_id: Uuid) -> (Uuid, PaymentStatus) {
    let command = CreatePaymentBuilder::new()
        .appointment_id(appointment_id)
        .amount(Decimal::new(5000, 2))
        .currency("usd")
        .build();
    match payments.dispatch(PaymentRequest::Create(command)).await {
        Ok(PaymentResponse::Created(result)) => (result.payment_id, result.status),
        other => panic!("unexpected create outcome: {other:?}"),
    }
}

#[tokio::test]
async fn approved_payment_is_completed_and_its_completion_is_relayed() {
    let store = Arc::new(InMemoryPaymentStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let payments = dispatcher(&store, InMemoryPaymentProcessor::approving_with("pi_abc"));
    let appointment_id = Uuid::now_v7();

    let (payment_id, status) = create(&payments, appointment_id).await;

    assert_eq!(status, PaymentStatus::Completed);
    let stored = store.find_by_id(payment_id).await.unwrap().unwrap();
    assert_eq!(stored.processor_reference(), Some("pi_abc"));
    assert_eq!(stored.amount(), Decimal::new(5000, 2));

    let entries = store.outbox_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].aggregate_id, payment_id);
    assert_eq!(entries[0].event_type, "PaymentCompletedIntegrationEvent");

    let report = OutboxRelay::new(store.clone(), bus.clone(), relay_config(5))
        .run_once()
        .await
        .unwrap();
    assert_eq!(report.published, 1);

    let published = bus.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].routing_key, "PaymentCompletedIntegrationEvent");
    let message: PaymentCompletedIntegrationEvent =
        serde_json::from_slice(&published[0].payload).unwrap();
    assert_eq!(
        message,
        PaymentCompletedIntegrationEvent {
            payment_id,
            appointment_id,
            status: "Completed".into(),
            transaction_id: "pi_abc".into(),
        }
    );
    assert!(store.outbox_entries().await[0].processed);
}

#[tokio::test]
async fn declined_payment_is_failed_with_the_processor_reason() {
    let store = Arc::new(InMemoryPaymentStore::new());
    let payments = dispatcher(&store, InMemoryPaymentProcessor::declining("card_declined"));
    let appointment_id = Uuid::now_v7();

    let (payment_id, status) = create(&payments, appointment_id).await;

    assert_eq!(status, PaymentStatus::Failed);
    let stored = store.find_by_id(payment_id).await.unwrap().unwrap();
    assert_eq!(stored.failure_reason(), Some("card_declined"));

    let entries = store.outbox_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event_type, "PaymentFailedIntegrationEvent");
    let message: PaymentFailedIntegrationEvent =
        serde_json::from_slice(&entries[0].payload).unwrap();
    assert_eq!(message.payment_id, payment_id);
    assert_eq!(message.appointment_id, appointment_id);
    assert_eq!(message.reason, "card_declined");
}

#[tokio::test]
async fn repeated_create_for_the_same_appointment_charges_once() {
    let store = Arc::new(InMemoryPaymentStore::new());
    let processor = Arc::new(InMemoryPaymentProcessor::approving());
    let payments = PaymentsDispatcher::new(store.clone(), processor.clone());
    let appointment_id = Uuid::now_v7();

    let first = create(&payments, appointment_id).await;
    let second = create(&payments, appointment_id).await;

    assert_eq!(first, second);
    assert_eq!(store.payment_count().await, 1);
    assert_eq!(store.outbox_entries().await.len(), 1);
    assert_eq!(processor.charges().await.len(), 1);

    let repeat = payments
        .dispatch(PaymentRequest::Complete(CompletePayment { payment_id: first.0 }))
        .await;
    assert!(matches!(repeat, Err(ApplicationError::Domain(_))));
    assert_eq!(processor.charges().await.len(), 1);
}

#[tokio::test]
async fn failed_outbox_write_leaves_neither_state_change_nor_message() {
    let mut store = InMemoryPaymentStore::new();
    store.toggle_failing_outbox_writes();
    let store = Arc::new(store);
    let payments = dispatcher(&store, InMemoryPaymentProcessor::approving_with("pi_abc"));

    let (payment_id, status) = create(&payments, Uuid::now_v7()).await;

    assert_eq!(status, PaymentStatus::Pending);
    let stored = store.find_by_id(payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), PaymentStatus::Pending);
    assert_eq!(stored.processor_reference(), None);
    assert!(store.outbox_entries().await.is_empty());
}

#[tokio::test]
async fn unpublishable_entry_is_dead_lettered_then_replayed() {
    let store = Arc::new(InMemoryPaymentStore::new());
    let payments = dispatcher(&store, InMemoryPaymentProcessor::approving_with("pi_abc"));
    let (payment_id, _) = create(&payments, Uuid::now_v7()).await;

    let broken = Arc::new(InMemoryEventBus::rejecting(|_, _| true));
    let relay = OutboxRelay::new(store.clone(), broken.clone(), relay_config(2));
    for _ in 0..3 {
        relay.run_once().await.unwrap();
    }

    let dead = store.dead_letters(2, 10).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].aggregate_id, payment_id);
    assert_eq!(dead[0].retry_count, 2);
    assert!(store.get_unprocessed(10, 2).await.unwrap().is_empty());
    assert!(broken.published().await.is_empty());

    assert!(store.replay(dead[0].id).await.unwrap());
    let healthy = Arc::new(InMemoryEventBus::new());
    let report = OutboxRelay::new(store.clone(), healthy.clone(), relay_config(2))
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.published, 1);
    assert_eq!(healthy.published().await.len(), 1);
    assert!(store.dead_letters(2, 10).await.unwrap().is_empty());
}
