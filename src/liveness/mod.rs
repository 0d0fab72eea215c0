//! Hosting liveness polling.
//!
//! After GitHub Pages is enabled the site takes a while to build and start
//! serving. The poller waits a settle delay, then probes the URL on a fixed
//! interval until it answers HTTP 200. Liveness is advisory: a site that never
//! comes up is logged, and the caller still reports its URL.
//!
//! No delay follows the final failed probe, so the default worst case is the
//! 10s settle delay plus eleven 10s gaps: 120s of sleeping rather than the
//! roughly 130s a sleep-after-every-probe loop would take.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::http::{HttpClient, HttpError};
use crate::retry::{RetryOutcome, RetryPolicy, retry_with_backoff};

/// Timing for a liveness wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivenessConfig {
    /// Delay before the first probe.
    pub settle_delay: Duration,

    /// Probe budget and spacing.
    pub policy: RetryPolicy,
}

impl LivenessConfig {
    pub fn new(settle_delay: Duration, attempts: u32, interval: Duration) -> Self {
        Self {
            settle_delay,
            policy: RetryPolicy::fixed(attempts, interval),
        }
    }

    /// Worst-case time spent sleeping, excluding the probes themselves.
    pub fn total_max_wait(&self) -> Duration {
        self.settle_delay + self.policy.total_max_wait()
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(10),
            policy: RetryPolicy::PAGES_LIVENESS,
        }
    }
}

/// Result of waiting for a site to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessOutcome {
    /// The site answered HTTP 200 on probe number `attempts`.
    Live { attempts: u32 },

    /// The site never answered HTTP 200.
    NotLive { attempts: u32 },
}

impl LivenessOutcome {
    pub fn is_live(&self) -> bool {
        matches!(self, LivenessOutcome::Live { .. })
    }
}

/// Waits until `url` serves HTTP 200 or the probe budget is spent.
pub async fn wait_until_live<H: HttpClient>(
    http: &H,
    url: &str,
    config: &LivenessConfig,
) -> LivenessOutcome {
    debug!(url, settle_secs = config.settle_delay.as_secs(), "Waiting for site to settle");
    tokio::time::sleep(config.settle_delay).await;

    let outcome = retry_with_backoff(&config.policy, |attempt| async move {
        match http.get_status(url).await {
            Ok(StatusCode::OK) => Ok(()),
            Ok(status) => {
                debug!(attempt, %status, url, "Site not live yet");
                Err(HttpError::Status {
                    url: url.to_string(),
                    status,
                })
            }
            Err(e) => {
                debug!(attempt, error = %e, url, "Liveness probe failed");
                Err(e)
            }
        }
    })
    .await;

    match outcome {
        RetryOutcome::Success { attempts, .. } => {
            info!(url, attempts, "Site is live");
            LivenessOutcome::Live { attempts }
        }
        RetryOutcome::Exhausted { attempts, .. } | RetryOutcome::Permanent { attempts, .. } => {
            warn!(url, attempts, "Site did not respond with 200 OK after retries");
            LivenessOutcome::NotLive { attempts }
        }
    }
}
