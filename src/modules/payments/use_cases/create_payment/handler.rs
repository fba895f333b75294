use crate::modules::payments::adapters::outbound::intent_outbox::{Write, persist_with_outbox};
use crate::modules::payments::adapters::outbound::payment_processor::PaymentProcessor;
use crate::modules::payments::adapters::outbound::payment_store::{PaymentStore, StoreError};
use crate::modules::payments::core::payment::Payment;
use crate::modules::payments::core::state::PaymentStatus;
use crate::modules::payments::use_cases::complete_payment::command::CompletePayment;
use crate::modules::payments::use_cases::complete_payment::handler::CompletePaymentHandler;
use crate::modules::payments::use_cases::create_payment::command::CreatePayment;
use crate::modules::payments::use_cases::errors::ApplicationError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResult {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
}

impl From<&Payment> for CreatePaymentResult {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id(),
            status: payment.status(),
        }
    }
}

/// Creates the payment for an appointment, then completes it in line.
///
/// Idempotent on the appointment id: a repeated trigger gets the existing
/// payment back unchanged, including when two triggers race to the insert.
pub struct CreatePaymentHandler<TStore, TProcessor>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    store: Arc<TStore>,
    complete: CompletePaymentHandler<TStore, TProcessor>,
}

impl<TStore, TProcessor> CreatePaymentHandler<TStore, TProcessor>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    pub fn new(store: Arc<TStore>, processor: Arc<TProcessor>) -> Self {
        Self {
            complete: CompletePaymentHandler::new(store.clone(), processor),
            store,
        }
    }

    pub async fn handle(
        &self,
        command: CreatePayment,
    ) -> Result<CreatePaymentResult, ApplicationError> {
        command.validate()?;

        if let Some(existing) = self
            .store
            .find_by_appointment_id(command.appointment_id)
            .await?
        {
            info!(
                appointment_id = %command.appointment_id,
                payment_id = %existing.id(),
                "payment already exists for appointment"
            );
            return Ok(CreatePaymentResult::from(&existing));
        }

        let mut payment = Payment::create(
            command.appointment_id,
            command.payer_id,
            command.amount,
            &command.currency,
        )?;

        match persist_with_outbox(&*self.store, &mut payment, Write::Insert).await {
            Ok(_) => {}
            Err(StoreError::DuplicateAppointment(appointment_id)) => {
                return self.winner_of_race(appointment_id).await;
            }
            Err(err) => return Err(err.into()),
        }
        info!(
            payment_id = %payment.id(),
            appointment_id = %payment.appointment_id(),
            "payment created"
        );

        let status = match self
            .complete
            .handle(CompletePayment {
                payment_id: payment.id(),
            })
            .await
        {
            Ok(result) => result.status,
            Err(err) => {
                warn!(
                    payment_id = %payment.id(),
                    error = %err,
                    "completing new payment failed, leaving it pending"
                );
                payment.status()
            }
        };

        Ok(CreatePaymentResult {
            payment_id: payment.id(),
            status,
        })
    }

    async fn winner_of_race(
        &self,
        appointment_id: Uuid,
    ) -> Result<CreatePaymentResult, ApplicationError> {
        let winner = self
            .store
            .find_by_appointment_id(appointment_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::Unexpected(format!(
                    "uniqueness violation for appointment {appointment_id} but no payment found"
                ))
            })?;
        info!(
            appointment_id = %appointment_id,
            payment_id = %winner.id(),
            "lost creation race, returning existing payment"
        );
        Ok(CreatePaymentResult::from(&winner))
    }
}
