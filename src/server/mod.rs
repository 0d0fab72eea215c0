//! HTTP intake server.
//!
//! # Endpoints
//!
//! - `POST /api/task` - Accepts a task submission and queues it
//! - `GET /health` - Returns 200 if the server is running
//! - `GET /` - Service description

use std::sync::Arc;

use tower_http::trace::TraceLayer;

use crate::worker::TaskQueue;

pub mod health;
pub mod intake;

pub use health::{health_handler, root_handler};
pub use intake::{Accepted, IntakeError, task_handler};

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    queue: TaskQueue,

    /// Shared secret every submission must carry.
    secret: String,
}

impl AppState {
    pub fn new(queue: TaskQueue, secret: impl Into<String>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                queue,
                secret: secret.into(),
            }),
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    pub fn secret(&self) -> &str {
        &self.inner.secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/api/task", post(task_handler))
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
