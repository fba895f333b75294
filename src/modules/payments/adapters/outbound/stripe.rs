use crate::modules::payments::adapters::outbound::payment_processor::{
    PaymentProcessor, ProcessorError,
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

const CHARGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates Stripe PaymentIntents over the REST API.
#[derive(Debug, Clone)]
pub struct StripePaymentProcessor {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct PaymentIntent {
    id: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Deserialize)]
struct StripeError {
    code: Option<String>,
    message: Option<String>,
}

impl StripePaymentProcessor {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(CHARGE_TIMEOUT).build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

/// Stripe amounts are integers in the currency's smallest unit.
fn to_minor_units(amount: Decimal) -> Result<i64, ProcessorError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ProcessorError::Rejected(format!("amount {amount} out of range")))
}

fn charge_form(amount: i64, currency: &str, reference_id: Uuid) -> Vec<(&'static str, String)> {
    vec![
        ("amount", amount.to_string()),
        ("currency", currency.to_lowercase()),
        ("automatic_payment_methods[enabled]", "true".into()),
        ("metadata[appointmentId]", reference_id.to_string()),
        ("metadata[service]", "payments".into()),
        ("description", format!("Appointment payment for {reference_id}")),
    ]
}

#[async_trait]
impl PaymentProcessor for StripePaymentProcessor {
    async fn create_charge(
        &self,
        amount: Decimal,
        currency: &str,
        reference_id: Uuid,
    ) -> Result<String, ProcessorError> {
        let form = charge_form(to_minor_units(amount)?, currency, reference_id);
        info!(appointment_id = %reference_id, %amount, currency, "creating Stripe PaymentIntent");

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|err| ProcessorError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let intent: PaymentIntent = response
                .json()
                .await
                .map_err(|err| ProcessorError::Unavailable(err.to_string()))?;
            info!(
                appointment_id = %reference_id,
                intent_id = %intent.id,
                "Stripe PaymentIntent created"
            );
            return Ok(intent.id);
        }

        let reason = match response.json::<StripeErrorBody>().await {
            Ok(body) => body
                .error
                .code
                .or(body.error.message)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        error!(
            appointment_id = %reference_id,
            %status,
            reason = %reason,
            "Stripe PaymentIntent creation failed"
        );

        if status.is_client_error() {
            Err(ProcessorError::Rejected(reason))
        } else {
            Err(ProcessorError::Unavailable(reason))
        }
    }
}
