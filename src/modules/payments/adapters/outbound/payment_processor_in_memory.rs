use crate::modules::payments::adapters::outbound::payment_processor::{
    PaymentProcessor, ProcessorError,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub currency: String,
    pub reference_id: Uuid,
}

#[derive(Debug, Clone)]
enum Outcome {
    Approve(Option<String>),
    Decline(ProcessorError),
}

/// Scripted processor. Approves with a generated `pi_` reference unless told otherwise.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentProcessor {
    outcome: Outcome,
    charges: Arc<Mutex<Vec<ChargeRequest>>>,
}

impl Default for InMemoryPaymentProcessor {
    fn default() -> Self {
        Self {
            outcome: Outcome::Approve(None),
            charges: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl InMemoryPaymentProcessor {
    pub fn approving() -> Self {
        Self::default()
    }

    pub fn approving_with(reference: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Approve(Some(reference.into())),
            ..Self::default()
        }
    }

    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Decline(ProcessorError::Rejected(reason.into())),
            ..Self::default()
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Decline(ProcessorError::Unavailable(reason.into())),
            ..Self::default()
        }
    }

    pub async fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_charge(
        &self,
        amount: Decimal,
        currency: &str,
        reference_id: Uuid,
    ) -> Result<String, ProcessorError> {
        self.charges.lock().await.push(ChargeRequest {
            amount,
            currency: currency.to_string(),
            reference_id,
        });
        match &self.outcome {
            Outcome::Approve(Some(reference)) => Ok(reference.clone()),
            Outcome::Approve(None) => Ok(format!("pi_{}", Uuid::now_v7().simple())),
            Outcome::Decline(err) => Err(err.clone()),
        }
    }
}
