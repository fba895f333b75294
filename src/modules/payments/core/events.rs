// Domain events raised by the Payment aggregate.
//
// Purpose
// - Record what happened to a payment so the persistence layer can decide which
//   facts leave the service (see adapters/outbound/intent_outbox.rs).
//
// Versioning
// - Prefer additive changes. Do not change the meaning of an existing variant.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCreated {
    pub payment_id: Uuid,
    pub appointment_id: Uuid,
    pub payer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    pub payment_id: Uuid,
    pub appointment_id: Uuid,
    pub transaction_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub payment_id: Uuid,
    pub appointment_id: Uuid,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    PaymentCreated(PaymentCreated),
    PaymentCompleted(PaymentCompleted),
    PaymentFailed(PaymentFailed),
}

impl PaymentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => "PaymentCreated",
            PaymentEvent::PaymentCompleted(_) => "PaymentCompleted",
            PaymentEvent::PaymentFailed(_) => "PaymentFailed",
        }
    }

    pub fn payment_id(&self) -> Uuid {
        match self {
            PaymentEvent::PaymentCreated(e) => e.payment_id,
            PaymentEvent::PaymentCompleted(e) => e.payment_id,
            PaymentEvent::PaymentFailed(e) => e.payment_id,
        }
    }
}
