use crate::modules::payments::adapters::outbound::payment_store::StoreError;
use crate::modules::payments::core::errors::DomainError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("payment {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unexpected: {0}")]
    Unexpected(String),
}
