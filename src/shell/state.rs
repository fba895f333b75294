use crate::modules::payments::adapters::outbound::payment_processor::PaymentProcessor;
use crate::modules::payments::adapters::outbound::payment_store_in_memory::InMemoryPaymentStore;
use crate::modules::payments::use_cases::dispatch::PaymentsDispatcher;
use crate::shared::infrastructure::intent_outbox::OutboxStore;
use std::sync::Arc;

pub type Payments = PaymentsDispatcher<InMemoryPaymentStore, dyn PaymentProcessor>;

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<Payments>,
    pub outbox: Arc<dyn OutboxStore>,
    pub max_retries: u32,
}

impl AppState {
    pub fn new(
        store: Arc<InMemoryPaymentStore>,
        processor: Arc<dyn PaymentProcessor>,
        max_retries: u32,
    ) -> Self {
        Self {
            payments: Arc::new(PaymentsDispatcher::new(store.clone(), processor)),
            outbox: store,
            max_retries,
        }
    }
}
