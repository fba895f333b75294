use crate::modules::payments::adapters::outbound::intent_outbox::{Write, persist_with_outbox};
use crate::modules::payments::adapters::outbound::payment_processor::PaymentProcessor;
use crate::modules::payments::adapters::outbound::payment_store::PaymentStore;
use crate::modules::payments::use_cases::complete_payment::command::{
    CompletePayment, CompletePaymentResult,
};
use crate::modules::payments::use_cases::errors::ApplicationError;
use std::sync::Arc;
use tracing::{info, warn};

/// Charges a pending payment and records the outcome.
///
/// A processor failure is not an error here: it becomes a Failed payment with
/// the processor's reason, persisted like any other outcome.
pub struct CompletePaymentHandler<TStore, TProcessor>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    store: Arc<TStore>,
    processor: Arc<TProcessor>,
}

impl<TStore, TProcessor> CompletePaymentHandler<TStore, TProcessor>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    pub fn new(store: Arc<TStore>, processor: Arc<TProcessor>) -> Self {
        Self { store, processor }
    }

    pub async fn handle(
        &self,
        command: CompletePayment,
    ) -> Result<CompletePaymentResult, ApplicationError> {
        let mut payment = self
            .store
            .find_by_id(command.payment_id)
            .await?
            .ok_or(ApplicationError::NotFound(command.payment_id))?;

        // A Processing payment may already be charged.
        payment.ensure_chargeable()?;

        match self
            .processor
            .create_charge(payment.amount(), payment.currency(), payment.appointment_id())
            .await
        {
            Ok(reference) => {
                payment.mark_processing(reference)?;
                payment.mark_completed()?;
            }
            Err(err) => {
                warn!(
                    payment_id = %payment.id(),
                    error = %err,
                    "payment processor declined the charge"
                );
                payment.mark_failed(err.reason())?;
            }
        }

        persist_with_outbox(&*self.store, &mut payment, Write::Update).await?;
        info!(
            payment_id = %payment.id(),
            status = %payment.status(),
            "payment settled"
        );

        Ok(CompletePaymentResult {
            payment_id: payment.id(),
            status: payment.status(),
            transaction_id: payment.processor_reference().map(str::to_string),
        })
    }
}
