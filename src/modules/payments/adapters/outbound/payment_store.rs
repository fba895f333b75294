use crate::modules::payments::core::payment::Payment;
use crate::shared::infrastructure::intent_outbox::{OutboxError, OutboxWriter};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("a payment already exists for appointment {0}")]
    DuplicateAppointment(Uuid),

    #[error("payment {0} not found")]
    NotFound(Uuid),

    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error(transparent)]
    Outbox(#[from] OutboxError),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable payment rows.
///
/// Writes only happen through a [`PaymentTransaction`], which also carries the
/// outbox writes so both land or neither does. Appointment ids are unique.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    type Tx: PaymentTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn find_by_appointment_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Payment>, StoreError>;
}

/// An open storage transaction spanning the payment row and its outbox entries.
#[async_trait]
pub trait PaymentTransaction: OutboxWriter + Send {
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    /// Fails at commit with `VersionConflict` if the row moved on since `payment` was loaded.
    async fn update_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
