//! Result notification with bounded exponential backoff.
//!
//! The notifier is the last step of every task. It POSTs the [`ResultPayload`]
//! to the caller's evaluation URL until the caller answers HTTP 200 or the
//! attempt budget runs out. Exhaustion is logged and reported as an outcome,
//! never raised: there is nothing further the pipeline can do for that task.

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::http::{HttpClient, HttpError};
use crate::retry::{RetryOutcome, RetryPolicy, retry_with_backoff};
use crate::types::ResultPayload;

/// How a notification ended.
#[derive(Debug)]
pub enum NotifyOutcome {
    /// The callback acknowledged with HTTP 200 on attempt `attempts`.
    Delivered { attempts: u32 },

    /// Every attempt failed; the task's result is lost.
    Abandoned { attempts: u32, last_error: HttpError },
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            NotifyOutcome::Delivered { attempts } | NotifyOutcome::Abandoned { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Posts result payloads to callback URLs.
#[derive(Debug, Clone)]
pub struct Notifier<H> {
    http: H,
    policy: RetryPolicy,
}

impl<H: HttpClient> Notifier<H> {
    pub fn new(http: H, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// Creates a notifier with the default policy: 20 attempts, 1s doubling to 16s.
    pub fn with_default_policy(http: H) -> Self {
        Self::new(http, RetryPolicy::NOTIFY)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy = self.policy.with_max_attempts(max_attempts);
        self
    }

    /// Delivers `payload` to `url`.
    ///
    /// Success is exactly HTTP 200; any other status or transport error is a
    /// failed attempt.
    pub async fn notify(&self, url: &str, payload: &ResultPayload) -> NotifyOutcome {
        let outcome = retry_with_backoff(&self.policy, |attempt| async move {
            match self.http.post_json(url, payload).await {
                Ok(StatusCode::OK) => Ok(()),
                Ok(status) => {
                    debug!(attempt, %status, url, "Callback rejected notification");
                    Err(HttpError::Status {
                        url: url.to_string(),
                        status,
                    })
                }
                Err(e) => {
                    debug!(attempt, error = %e, url, "Notification attempt failed");
                    Err(e)
                }
            }
        })
        .await;

        match outcome {
            RetryOutcome::Success { attempts, .. } => {
                info!(
                    url,
                    task = %payload.task,
                    round = payload.round,
                    attempts,
                    "Evaluation acknowledged"
                );
                NotifyOutcome::Delivered { attempts }
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            }
            | RetryOutcome::Permanent {
                error: last_error,
                attempts,
            } => {
                warn!(
                    url,
                    task = %payload.task,
                    round = payload.round,
                    attempts,
                    error = %last_error,
                    "Failed to notify after retries"
                );
                NotifyOutcome::Abandoned {
                    attempts,
                    last_error,
                }
            }
        }
    }
}
