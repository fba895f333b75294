use crate::modules::payments::core::errors::DomainError;
use crate::modules::payments::core::events::{
    PaymentCompleted, PaymentCreated, PaymentEvent, PaymentFailed,
};
use crate::modules::payments::core::state::PaymentStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::mem;
use uuid::Uuid;

/// Payment aggregate.
///
/// State only changes through the `mark_*` operations, which guard the
/// transition graph and stage the matching domain event. Staged events stay
/// on the aggregate until `drain_events` is called after a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    id: Uuid,
    appointment_id: Uuid,
    payer_id: String,
    amount: Decimal,
    currency: String,
    status: PaymentStatus,
    processor_reference: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    pending_events: Vec<PaymentEvent>,
}

/// Persisted shape of a payment. Carries no staged events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
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
    pub version: u64,
}

const SETTLE_FROM: [PaymentStatus; 2] = [PaymentStatus::Processing, PaymentStatus::Pending];

impl Payment {
    pub fn create(
        appointment_id: Uuid,
        payer_id: impl Into<String>,
        amount: Decimal,
        currency: &str,
    ) -> Result<Self, DomainError> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount);
        }
        if currency.trim().is_empty() {
            return Err(DomainError::InvalidCurrency);
        }

        let now = Utc::now();
        let mut payment = Self {
            id: Uuid::now_v7(),
            appointment_id,
            payer_id: payer_id.into(),
            amount,
            currency: currency.trim().to_lowercase(),
            status: PaymentStatus::Pending,
            processor_reference: None,
            failure_reason: None,
            created_at: now,
            updated_at: None,
            version: 0,
            pending_events: Vec::new(),
        };
        payment
            .pending_events
            .push(PaymentEvent::PaymentCreated(PaymentCreated {
                payment_id: payment.id,
                appointment_id: payment.appointment_id,
                payer_id: payment.payer_id.clone(),
                amount: payment.amount,
                currency: payment.currency.clone(),
                occurred_at: now,
            }));
        Ok(payment)
    }

    pub fn mark_processing(
        &mut self,
        processor_reference: impl Into<String>,
    ) -> Result<(), DomainError> {
        self.ensure_chargeable()?;
        self.status = PaymentStatus::Processing;
        self.processor_reference = Some(processor_reference.into());
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self) -> Result<(), DomainError> {
        self.ensure_can_settle()?;
        let now = Utc::now();
        self.status = PaymentStatus::Completed;
        self.updated_at = Some(now);
        self.pending_events
            .push(PaymentEvent::PaymentCompleted(PaymentCompleted {
                payment_id: self.id,
                appointment_id: self.appointment_id,
                transaction_id: self.processor_reference.clone().unwrap_or_default(),
                occurred_at: now,
            }));
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_can_settle()?;
        let now = Utc::now();
        let reason = reason.into();
        self.status = PaymentStatus::Failed;
        self.failure_reason = Some(reason.clone());
        self.updated_at = Some(now);
        self.pending_events.push(PaymentEvent::PaymentFailed(PaymentFailed {
            payment_id: self.id,
            appointment_id: self.appointment_id,
            reason,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Fails unless the payment has not been sent to the processor yet.
    pub fn ensure_chargeable(&self) -> Result<(), DomainError> {
        if self.status == PaymentStatus::Pending {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.status,
                allowed: vec![PaymentStatus::Pending],
            })
        }
    }

    fn ensure_can_settle(&self) -> Result<(), DomainError> {
        if SETTLE_FROM.contains(&self.status) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.status,
                allowed: SETTLE_FROM.to_vec(),
            })
        }
    }

    pub fn pending_events(&self) -> &[PaymentEvent] {
        &self.pending_events
    }

    pub fn drain_events(&mut self) -> Vec<PaymentEvent> {
        mem::take(&mut self.pending_events)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn appointment_id(&self) -> Uuid {
        self.appointment_id
    }

    pub fn payer_id(&self) -> &str {
        &self.payer_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn processor_reference(&self) -> Option<&str> {
        self.processor_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Version of the stored row this instance was loaded from. 0 until first persisted.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Called by the persistence layer once the row write has committed.
    pub fn advance_version(&mut self) {
        self.version += 1;
    }

    pub fn to_record(&self) -> PaymentRecord {
        PaymentRecord {
            id: self.id,
            appointment_id: self.appointment_id,
            payer_id: self.payer_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            status: self.status,
            processor_reference: self.processor_reference.clone(),
            failure_reason: self.failure_reason.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    pub fn restore(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            appointment_id: record.appointment_id,
            payer_id: record.payer_id,
            amount: record.amount,
            currency: record.currency,
            status: record.status,
            processor_reference: record.processor_reference,
            failure_reason: record.failure_reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            pending_events: Vec::new(),
        }
    }
}
