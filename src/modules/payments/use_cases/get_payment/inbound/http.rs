use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::modules::payments::use_cases::dispatch::{PaymentRequest, PaymentResponse};
use crate::modules::payments::use_cases::errors::ApplicationError;
use crate::modules::payments::use_cases::get_payment::handler::GetPayment;
use crate::shell::http::error_response;
use crate::shell::state::AppState;

pub async fn handle(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(payment_id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid payment id: {id}"));
    };

    match state
        .payments
        .dispatch(PaymentRequest::Get(GetPayment { payment_id }))
        .await
    {
        Ok(PaymentResponse::Found(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(other) => {
            ApplicationError::Unexpected(format!("unexpected response {other:?}")).into_response()
        }
        Err(err) => err.into_response(),
    }
}
