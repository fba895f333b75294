use async_graphql::{Context, ID, Object, Result as GqlResult};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::modules::payments::use_cases::create_payment::command::CreatePayment;
use crate::modules::payments::use_cases::dispatch::{PaymentRequest, PaymentResponse};
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlCreatedPayment {
    pub payment_id: ID,
    pub status: String,
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// `amount` is a decimal string such as "50.00".
    async fn create_payment(
        &self,
        context: &Context<'_>,
        appointment_id: ID,
        payer_id: String,
        amount: String,
        currency: String,
    ) -> GqlResult<GqlCreatedPayment> {
        let state = context.data_unchecked::<AppState>();

        let command = CreatePayment {
            appointment_id: Uuid::parse_str(&appointment_id)
                .map_err(|e| async_graphql::Error::new(e.to_string()))?,
            payer_id,
            amount: Decimal::from_str(&amount)
                .map_err(|e| async_graphql::Error::new(e.to_string()))?,
            currency,
        };

        match state
            .payments
            .dispatch(PaymentRequest::Create(command))
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?
        {
            PaymentResponse::Created(result) => Ok(GqlCreatedPayment {
                payment_id: ID(result.payment_id.to_string()),
                status: result.status.to_string(),
            }),
            other => Err(async_graphql::Error::new(format!("unexpected response {other:?}"))),
        }
    }
}
