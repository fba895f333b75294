use crate::modules::payments::core::state::PaymentStatus;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletePayment {
    pub payment_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentResult {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}
