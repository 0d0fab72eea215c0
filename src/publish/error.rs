//! GitHub API error types.
//!
//! Errors are split into transient and permanent failures for retry decisions:
//!
//! - **Transient** errors are retriable (5xx, rate limits, network failures, timeouts)
//! - **Permanent** errors are not (most 4xx: bad credentials, missing scopes, validation)

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::retry::Retriable;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Safe to retry with backoff.
    Transient,

    /// Retrying will not help.
    Permanent,
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl Retriable for GitHubApiError {
    fn is_retriable(&self) -> bool {
        self.kind == GitHubErrorKind::Transient
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// An API call that did not answer within `timeout`.
    pub fn timed_out(operation: &str, timeout: Duration) -> Self {
        Self::transient_without_source(format!(
            "{operation} timed out after {}s",
            timeout.as_secs()
        ))
    }

    /// Categorizes an error by HTTP status code and message.
    pub fn from_status(status_code: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify(status_code, &message),
            status_code,
            message,
            source: None,
        }
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = extract_status_code(&err);
        let message = match &err {
            octocrab::Error::GitHub { source, .. } => source.message.clone(),
            other => other.to_string(),
        };

        Self {
            kind: classify(status_code, &message),
            status_code,
            message,
            source: Some(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    if is_transient_message(message) {
        return GitHubErrorKind::Transient;
    }

    match status_code {
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

/// Extracts the HTTP status code from an octocrab error, if present.
///
/// GitHub API errors carry the status directly. Other variants fall back to
/// scanning the message, which returns `None` (and so a permanent
/// categorization) when nothing matches.
fn extract_status_code(err: &octocrab::Error) -> Option<u16> {
    if let octocrab::Error::GitHub { source, .. } = err {
        return Some(source.status_code.as_u16());
    }
    status_code_from_message(&err.to_string())
}

fn status_code_from_message(message: &str) -> Option<u16> {
    if let Some(idx) = message.find("status: ") {
        let digits: String = message[idx + 8..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            return Some(code);
        }
    }

    [404, 409, 422, 403, 401, 429, 500, 502, 503]
        .into_iter()
        .find(|code| message.contains(&code.to_string()))
}

/// Checks if an error message asks the client to retry.
fn is_transient_message(message: &str) -> bool {
    message.to_lowercase().contains("try again")
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}
