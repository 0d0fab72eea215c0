//! Health check and welcome endpoints.

use axum::Json;
use serde_json::{Value, json};

/// Returns `{"status":"ok"}` while the server is accepting connections.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Describes the service at `/`.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Static site generation pipeline",
        "endpoints": {
            "submit": "POST /api/task",
            "health": "GET /health",
        },
    }))
}
