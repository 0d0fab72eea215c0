//! Outbound HTTP for the pipeline core.
//!
//! The notifier, the liveness poller and the attachment resolver only need three
//! request shapes. They reach the network through the [`HttpClient`] trait so
//! tests can substitute scripted transports. The reqwest implementation attaches
//! an explicit timeout to every request: a hung connection must never stall the
//! single worker.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::retry::Retriable;

/// Errors from an outbound HTTP request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request did not complete within its timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection, TLS or body transfer failure.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered, but not with the status the caller needs.
    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: StatusCode },
}

impl Retriable for HttpError {
    fn is_retriable(&self) -> bool {
        // Callbacks and Pages sites can answer 4xx while still coming up.
        true
    }
}

/// The outbound HTTP operations used by the pipeline.
pub trait HttpClient: Send + Sync {
    /// POSTs `body` as JSON and returns the response status.
    fn post_json<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> impl Future<Output = Result<StatusCode, HttpError>> + Send;

    /// GETs `url` and returns the response status, discarding the body.
    fn get_status(&self, url: &str) -> impl Future<Output = Result<StatusCode, HttpError>> + Send;

    /// GETs `url` and returns the body. Non-2xx responses are errors.
    fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Per-operation request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Result notification POSTs.
    pub notify: Duration,

    /// Liveness probes.
    pub probe: Duration,

    /// Attachment downloads.
    pub fetch: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        HttpTimeouts {
            notify: Duration::from_secs(30),
            probe: Duration::from_secs(10),
            fetch: Duration::from_secs(20),
        }
    }
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
    timeouts: HttpTimeouts,
}

impl ReqwestHttp {
    pub fn new(client: reqwest::Client, timeouts: HttpTimeouts) -> Self {
        Self { client, timeouts }
    }
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), HttpTimeouts::default())
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else {
        HttpError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl HttpClient for ReqwestHttp {
    async fn post_json<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<StatusCode, HttpError> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeouts.notify)
            .json(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        Ok(response.status())
    }

    async fn get_status(&self, url: &str) -> Result<StatusCode, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeouts.probe)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        Ok(response.status())
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeouts.fetch)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.notify, Duration::from_secs(30));
        assert_eq!(timeouts.probe, Duration::from_secs(10));
        assert_eq!(timeouts.fetch, Duration::from_secs(20));
    }

    #[test]
    fn status_error_mentions_code_and_url() {
        let err = HttpError::Status {
            url: "https://example.com/cb".to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("https://example.com/cb"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let http = ReqwestHttp::new(
            reqwest::Client::new(),
            HttpTimeouts {
                notify: Duration::from_secs(2),
                probe: Duration::from_secs(2),
                fetch: Duration::from_secs(2),
            },
        );

        // Port 9 (discard) on localhost is essentially never listening.
        let result = http.get_status("http://127.0.0.1:9/").await;

        assert!(matches!(
            result,
            Err(HttpError::Transport { .. } | HttpError::Timeout { .. })
        ));
    }
}
