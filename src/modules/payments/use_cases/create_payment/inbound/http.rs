use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::modules::payments::use_cases::create_payment::command::CreatePayment;
use crate::modules::payments::use_cases::dispatch::{PaymentRequest, PaymentResponse};
use crate::modules::payments::use_cases::errors::ApplicationError;
use crate::shell::http::error_response;
use crate::shell::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub appointment_id: Uuid,
    pub payer_id: String,
    pub amount: Decimal,
    pub currency: String,
}

pub async fn handle(
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };

    let command = CreatePayment {
        appointment_id: body.appointment_id,
        payer_id: body.payer_id,
        amount: body.amount,
        currency: body.currency,
    };

    match state.payments.dispatch(PaymentRequest::Create(command)).await {
        Ok(PaymentResponse::Created(result)) => {
            (StatusCode::CREATED, Json(result)).into_response()
        }
        Ok(other) => {
            ApplicationError::Unexpected(format!("unexpected response {other:?}")).into_response()
        }
        Err(err) => err.into_response(),
    }
}
