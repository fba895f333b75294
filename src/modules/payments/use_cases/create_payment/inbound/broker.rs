// Inbound broker trigger: an appointment slot was reserved, so charge for it.
//
// Messages may be redelivered. CreatePayment is idempotent on the appointment
// id, so a duplicate simply returns the existing payment.

use crate::modules::payments::adapters::outbound::payment_processor::PaymentProcessor;
use crate::modules::payments::adapters::outbound::payment_store::PaymentStore;
use crate::modules::payments::use_cases::create_payment::command::CreatePayment;
use crate::modules::payments::use_cases::create_payment::handler::CreatePaymentResult;
use crate::modules::payments::use_cases::dispatch::{
    PaymentRequest, PaymentResponse, PaymentsDispatcher,
};
use crate::modules::payments::use_cases::errors::ApplicationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const APPOINTMENT_SLOT_RESERVED: &str = "AppointmentSlotReservedEvent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlotReservedEvent {
    pub appointment_id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
}

pub async fn consume<TStore, TProcessor>(
    payments: &PaymentsDispatcher<TStore, TProcessor>,
    payload: &[u8],
) -> Result<CreatePaymentResult, ApplicationError>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    let event: AppointmentSlotReservedEvent = serde_json::from_slice(payload).map_err(|err| {
        ApplicationError::Validation(format!("malformed {APPOINTMENT_SLOT_RESERVED}: {err}"))
    })?;
    info!(
        appointment_id = %event.appointment_id,
        user_id = %event.user_id,
        "received {APPOINTMENT_SLOT_RESERVED}"
    );

    let command = CreatePayment {
        appointment_id: event.appointment_id,
        payer_id: event.user_id,
        amount: event.amount,
        currency: event.currency,
    };
    match payments.dispatch(PaymentRequest::Create(command)).await? {
        PaymentResponse::Created(result) => Ok(result),
        other => Err(ApplicationError::Unexpected(format!(
            "unexpected response {other:?}"
        ))),
    }
}

/// How often a message is retried when consuming it fails for a transient reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRetry {
    /// Attempts per message, the first one included. Default: 5.
    pub max_attempts: u32,

    /// Delay after the first failure, doubled on each further one. Default: 200ms.
    pub backoff_base: Duration,

    /// Upper bound for the delay. Default: 5 seconds.
    pub backoff_max: Duration,
}

impl Default for ConsumerRetry {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(5),
        }
    }
}

impl ConsumerRetry {
    fn backoff_duration(&self, failures: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(failures.saturating_sub(1));
        self.backoff_base
            .saturating_mul(multiplier)
            .min(self.backoff_max)
    }
}

/// Storage hiccups and unexpected responses may clear up; bad input and
/// domain rejections will not.
fn is_transient(err: &ApplicationError) -> bool {
    matches!(
        err,
        ApplicationError::Store(_) | ApplicationError::Unexpected(_)
    )
}

/// Consumes one message, retrying transient failures with backoff. Returns
/// `false` when shutdown interrupted the wait between attempts.
async fn consume_with_retry<TStore, TProcessor>(
    payments: &PaymentsDispatcher<TStore, TProcessor>,
    payload: &[u8],
    retry: &ConsumerRetry,
    shutdown: &mut watch::Receiver<bool>,
) -> bool
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    let mut failures = 0;
    loop {
        let err = match consume(payments, payload).await {
            Ok(_) => return true,
            Err(e) => e,
        };
        failures += 1;

        if !is_transient(&err) {
            error!(
                topic = APPOINTMENT_SLOT_RESERVED,
                error = %err,
                "dropping message that cannot be consumed"
            );
            return true;
        }
        if failures >= retry.max_attempts {
            error!(
                topic = APPOINTMENT_SLOT_RESERVED,
                attempts = failures,
                error = %err,
                "giving up on message"
            );
            return true;
        }

        let delay = retry.backoff_duration(failures);
        warn!(
            topic = APPOINTMENT_SLOT_RESERVED,
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "failed to consume message, retrying"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    warn!(
                        topic = APPOINTMENT_SLOT_RESERVED,
                        attempts = failures,
                        error = %err,
                        "shutdown requested, abandoning message"
                    );
                    return false;
                }
            }
        }
    }
}

/// Feed `messages` into CreatePayment until the channel closes or shutdown is signalled.
/// Messages that fail transiently are retried per `retry` before being dropped.
pub async fn run_consumer<TStore, TProcessor>(
    payments: Arc<PaymentsDispatcher<TStore, TProcessor>>,
    mut messages: mpsc::Receiver<Vec<u8>>,
    retry: ConsumerRetry,
    mut shutdown: watch::Receiver<bool>,
) where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    info!(topic = APPOINTMENT_SLOT_RESERVED, "consumer started");
    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(payload) = message else {
                    warn!(topic = APPOINTMENT_SLOT_RESERVED, "subscription closed");
                    break;
                };
                if !consume_with_retry(&payments, &payload, &retry, &mut shutdown).await {
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!(topic = APPOINTMENT_SLOT_RESERVED, "consumer shutting down");
}
