//! Task submission endpoint.
//!
//! Validates the shared secret, enqueues the task and answers immediately.
//! All pipeline work happens later on the worker.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use super::AppState;
use crate::types::TaskRequest;
use crate::worker::QueueError;

/// Errors that reject a submission.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid request body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid secret")]
    InvalidSecret,

    #[error("round must be at least 1")]
    InvalidRound,

    #[error("task queue is not accepting work")]
    Unavailable(#[from] QueueError),
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntakeError::InvalidJson(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IntakeError::InvalidSecret => StatusCode::FORBIDDEN,
            IntakeError::InvalidRound => StatusCode::UNPROCESSABLE_ENTITY,
            IntakeError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Acknowledgment returned for an accepted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub status: &'static str,
    pub task: String,
    pub round: u32,
}

/// Compares secrets without short-circuiting on the first differing byte.
fn secrets_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `POST /api/task`
///
/// - 200: queued; body is `{"status":"accepted","task":...,"round":...}`
/// - 403: wrong secret
/// - 422: malformed body or `round == 0`
/// - 503: the worker has stopped
pub async fn task_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<Json<Accepted>, IntakeError> {
    let task: TaskRequest = serde_json::from_slice(&body)?;

    if !secrets_match(&task.secret, app_state.secret()) {
        warn!(task = %task.task, email = %task.email, "Rejected submission with invalid secret");
        return Err(IntakeError::InvalidSecret);
    }
    if task.round == 0 {
        return Err(IntakeError::InvalidRound);
    }

    let accepted = Accepted {
        status: "accepted",
        task: task.task.clone(),
        round: task.round,
    };
    info!(task = %task.task, round = task.round, nonce = %task.nonce, "Task accepted");
    app_state.queue().enqueue(task)?;

    Ok(Json(accepted))
}
