// Operator endpoints for entries the relay gave up on.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::shared::infrastructure::intent_outbox::{OutboxEntry, OutboxError};
use crate::shell::http::error_response;
use crate::shell::state::AppState;

const DEAD_LETTER_PAGE: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterView {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: String,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEntry> for DeadLetterView {
    fn from(entry: OutboxEntry) -> Self {
        Self {
            id: entry.id,
            aggregate_id: entry.aggregate_id,
            event_type: entry.event_type,
            payload: String::from_utf8_lossy(&entry.payload).into_owned(),
            retry_count: entry.retry_count,
            created_at: entry.created_at,
        }
    }
}

fn outbox_error_response(err: OutboxError) -> Response {
    match err {
        OutboxError::NotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        _ => {
            error!(error = %err, "outbox admin request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn list_dead_letters(State(state): State<AppState>) -> Response {
    match state
        .outbox
        .dead_letters(state.max_retries, DEAD_LETTER_PAGE)
        .await
    {
        Ok(entries) => {
            let views: Vec<DeadLetterView> = entries.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => outbox_error_response(e),
    }
}

pub async fn replay(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(entry_id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid outbox entry id: {id}"));
    };

    match state.outbox.replay(entry_id).await {
        Ok(true) => {
            info!(entry_id = %entry_id, "outbox entry queued for replay");
            StatusCode::ACCEPTED.into_response()
        }
        Ok(false) => error_response(
            StatusCode::CONFLICT,
            format!("outbox entry {entry_id} was already processed"),
        ),
        Err(e) => outbox_error_response(e),
    }
}
