use crate::modules::payments::adapters::outbound::payment_store::PaymentStore;
use crate::modules::payments::core::payment::Payment;
use crate::modules::payments::core::state::PaymentStatus;
use crate::modules::payments::use_cases::errors::ApplicationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPayment {
    pub payment_id: Uuid,
}

/// Read model returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub payer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub processor_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id(),
            appointment_id: payment.appointment_id(),
            payer_id: payment.payer_id().to_string(),
            amount: payment.amount(),
            currency: payment.currency().to_string(),
            status: payment.status(),
            processor_reference: payment.processor_reference().map(str::to_string),
            failure_reason: payment.failure_reason().map(str::to_string),
            created_at: payment.created_at(),
            updated_at: payment.updated_at(),
        }
    }
}

pub struct GetPaymentHandler<TStore>
where
    TStore: PaymentStore + 'static,
{
    store: Arc<TStore>,
}

impl<TStore> GetPaymentHandler<TStore>
where
    TStore: PaymentStore + 'static,
{
    pub fn new(store: Arc<TStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetPayment) -> Result<PaymentView, ApplicationError> {
        self.store
            .find_by_id(query.payment_id)
            .await?
            .map(|payment| PaymentView::from(&payment))
            .ok_or(ApplicationError::NotFound(query.payment_id))
    }
}
