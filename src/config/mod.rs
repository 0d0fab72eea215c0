//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `GITHUB_TOKEN` | required |
//! | `GITHUB_OWNER` | required |
//! | `STUDENT_SECRET` | required |
//! | `WORKSPACE_ROOT` | `./workspace` |
//! | `BIND_ADDR` | `0.0.0.0:8000` |
//! | `OPENAI_API_KEY` | unset (generation falls back) |
//! | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
//! | `OPENAI_MODEL` | `gpt-4o-mini` |
//! | `NOTIFY_MAX_ATTEMPTS` | 20 |
//! | `PAGES_SETTLE_SECS` | 10 |
//! | `PAGES_POLL_ATTEMPTS` | 12 |
//! | `PAGES_POLL_INTERVAL_SECS` | 10 |
//! | `GIT_AUTHOR_NAME` | owner |
//! | `GIT_AUTHOR_EMAIL` | `<owner>@users.noreply.github.com` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::generate::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::liveness::LivenessConfig;
use crate::publish::CommitIdentity;
use crate::retry::RetryPolicy;

/// Errors loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Service configuration.
#[derive(Clone)]
pub struct Config {
    pub github_token: String,
    pub github_owner: String,
    pub secret: String,
    pub workspace_root: PathBuf,
    pub bind_addr: SocketAddr,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub notify_max_attempts: u32,
    pub liveness: LivenessConfig,
    pub commit_identity: CommitIdentity,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("github_owner", &self.github_owner)
            .field("workspace_root", &self.workspace_root)
            .field("bind_addr", &self.bind_addr)
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("has_openai_key", &self.openai_api_key.is_some())
            .field("notify_max_attempts", &self.notify_max_attempts)
            .field("liveness", &self.liveness)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let github_owner = required("GITHUB_OWNER")?;
        let default_identity = CommitIdentity::for_owner(&github_owner);

        Ok(Config {
            github_token: required("GITHUB_TOKEN")?,
            secret: required("STUDENT_SECRET")?,
            workspace_root: var("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./workspace")),
            bind_addr: parse_or("BIND_ADDR", var("BIND_ADDR"), || {
                SocketAddr::from(([0, 0, 0, 0], 8000))
            })?,
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            notify_max_attempts: parse_or("NOTIFY_MAX_ATTEMPTS", var("NOTIFY_MAX_ATTEMPTS"), || {
                RetryPolicy::NOTIFY.max_attempts
            })?,
            liveness: LivenessConfig::new(
                Duration::from_secs(parse_or(
                    "PAGES_SETTLE_SECS",
                    var("PAGES_SETTLE_SECS"),
                    || 10,
                )?),
                parse_or("PAGES_POLL_ATTEMPTS", var("PAGES_POLL_ATTEMPTS"), || 12)?,
                Duration::from_secs(parse_or(
                    "PAGES_POLL_INTERVAL_SECS",
                    var("PAGES_POLL_INTERVAL_SECS"),
                    || 10,
                )?),
            ),
            commit_identity: CommitIdentity::new(
                var("GIT_AUTHOR_NAME").unwrap_or(default_identity.name),
                var("GIT_AUTHOR_EMAIL").unwrap_or(default_identity.email),
            ),
            github_owner,
        })
    }
}

fn parse_or<T>(
    name: &'static str,
    value: Option<String>,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default()),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
