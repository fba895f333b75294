use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::modules::payments::adapters::outbound::payment_store::StoreError;
use crate::modules::payments::core::errors::DomainError;
use crate::modules::payments::use_cases::create_payment::inbound::http as create_http;
use crate::modules::payments::use_cases::errors::ApplicationError;
use crate::modules::payments::use_cases::get_payment::inbound::http as get_http;
use crate::shell::outbox_admin;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/payments", post(create_http::handle))
        .route("/api/payments/{id}", get(get_http::handle))
        .route("/api/outbox/dead-letters", get(outbox_admin::list_dead_letters))
        .route(
            "/api/outbox/dead-letters/{id}/replay",
            post(outbox_admin::replay),
        )
        .route("/liveness", get(liveness))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub status_code: u16,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
            status_code: status.as_u16(),
        }),
    )
        .into_response()
}

pub fn status_code(err: &ApplicationError) -> StatusCode {
    match err {
        ApplicationError::Validation(_) => StatusCode::BAD_REQUEST,
        ApplicationError::Domain(DomainError::InvalidAmount | DomainError::InvalidCurrency) => {
            StatusCode::BAD_REQUEST
        }
        ApplicationError::NotFound(_) | ApplicationError::Store(StoreError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        ApplicationError::Domain(DomainError::InvalidTransition { .. })
        | ApplicationError::Store(
            StoreError::DuplicateAppointment(_) | StoreError::VersionConflict { .. },
        ) => StatusCode::CONFLICT,
        ApplicationError::Store(_) | ApplicationError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        error_response(status, self.to_string())
    }
}

async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "Healthy" }))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.outbox.get_unprocessed(1, state.max_retries).await {
        Ok(_) => Json(json!({ "status": "Healthy" })).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "Unhealthy", "error": e.to_string() })),
        )
            .into_response(),
    }
}
