use crate::modules::payments::use_cases::errors::ApplicationError;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePayment {
    pub appointment_id: Uuid,
    pub payer_id: String,
    pub amount: Decimal,
    pub currency: String,
}

impl CreatePayment {
    /// Shape checks that run before any storage access.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.appointment_id.is_nil() {
            return Err(ApplicationError::Validation("appointmentId is required".into()));
        }
        if self.payer_id.trim().is_empty() {
            return Err(ApplicationError::Validation("payerId is required".into()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ApplicationError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ApplicationError::Validation(
                "currency must be a 3-letter code".into(),
            ));
        }
        Ok(())
    }
}
