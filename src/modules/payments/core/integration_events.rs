// Integration messages published to other services.
//
// These are self-contained: they carry plain identifiers and strings and never
// embed aggregate or domain-event types, so consumers do not depend on this crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletedIntegrationEvent {
    pub payment_id: Uuid,
    pub appointment_id: Uuid,
    pub status: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailedIntegrationEvent {
    pub payment_id: Uuid,
    pub appointment_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationEvent {
    PaymentCompleted(PaymentCompletedIntegrationEvent),
    PaymentFailed(PaymentFailedIntegrationEvent),
}

impl IntegrationEvent {
    /// Type tag stored on the outbox entry and used as the routing key.
    pub fn event_type(&self) -> &'static str {
        match self {
            IntegrationEvent::PaymentCompleted(_) => "PaymentCompletedIntegrationEvent",
            IntegrationEvent::PaymentFailed(_) => "PaymentFailedIntegrationEvent",
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            IntegrationEvent::PaymentCompleted(message) => serde_json::to_vec(message),
            IntegrationEvent::PaymentFailed(message) => serde_json::to_vec(message),
        }
    }
}
