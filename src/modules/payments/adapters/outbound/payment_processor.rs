use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("charge rejected: {0}")]
    Rejected(String),

    #[error("processor unavailable: {0}")]
    Unavailable(String),
}

impl ProcessorError {
    /// Text recorded as the payment's failure reason.
    pub fn reason(&self) -> &str {
        match self {
            ProcessorError::Rejected(reason) | ProcessorError::Unavailable(reason) => reason,
        }
    }
}

/// External charge API. May be slow and may fail.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Returns the processor's reference for the created charge.
    async fn create_charge(
        &self,
        amount: Decimal,
        currency: &str,
        reference_id: Uuid,
    ) -> Result<String, ProcessorError>;
}
