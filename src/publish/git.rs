//! Local git operations for publishing a working folder.
//!
//! Every invocation runs with a clean environment (no system or user config,
//! no terminal prompts) and under a timeout. Pushes force `HEAD` onto
//! `refs/heads/main` of the remote.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::types::{CommitSha, InvalidSha};

/// Default timeout for a single git invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command failed.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Git command did not finish in time and was killed.
    #[error("git command timed out after {}s: {command}", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    /// `rev-parse` produced something that is not a commit id.
    #[error("invalid SHA: {0}")]
    InvalidSha(#[from] InvalidSha),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Identity used for creating commits.
///
/// Passed via `-c` flags so commits work with global and system config disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// The committer/author name (git `user.name`).
    pub name: String,

    /// The committer/author email (git `user.email`).
    pub email: String,
}

impl CommitIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Identity derived from the publishing account.
    pub fn for_owner(owner: &str) -> Self {
        Self::new(owner, format!("{owner}@users.noreply.github.com"))
    }
}

/// Where pushes go.
///
/// `base_url` is joined with `<owner>/<repo>.git`. When a token is set it is
/// embedded as `x-access-token` credentials and redacted from all error text.
#[derive(Clone, PartialEq, Eq)]
pub struct GitRemote {
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRemote")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl GitRemote {
    /// Pushes to `https://github.com` authenticated with `token`.
    pub fn github(token: impl Into<String>) -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            token: Some(token.into()),
        }
    }

    /// Pushes to an arbitrary base without credentials.
    pub fn unauthenticated(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Returns the push URL for `owner/repo`, credentials included.
    pub fn url_for(&self, owner: &str, repo: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match (&self.token, base.split_once("://")) {
            (Some(token), Some((scheme, rest))) => {
                format!("{scheme}://x-access-token:{token}@{rest}/{owner}/{repo}.git")
            }
            _ => format!("{base}/{owner}/{repo}.git"),
        }
    }

    /// Removes the token from `text`.
    pub fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => text.replace(token.as_str(), "***"),
            _ => text.to_string(),
        }
    }
}

/// Runs git in one working folder.
#[derive(Debug, Clone)]
pub struct Git<'a> {
    workdir: &'a Path,
    timeout: Duration,
}

impl<'a> Git<'a> {
    pub fn new(workdir: &'a Path, timeout: Duration) -> Self {
        Self { workdir, timeout }
    }

    /// Create a git Command with clean environment (no system/user config).
    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(self.workdir);
        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.kill_on_drop(true);
        cmd
    }

    async fn output(&self, mut cmd: Command, display: String) -> GitResult<Output> {
        let command_display = &display;
        debug!(command = %command_display, "Running git");
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GitError::TimedOut {
                    command: display,
                    timeout: self.timeout,
                });
            }
        };

        if output.status.success() {
            Ok(output)
        } else {
            Err(GitError::CommandFailed {
                command: display,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run a git command and return stdout as a trimmed string.
    pub async fn run(&self, args: &[&str]) -> GitResult<String> {
        let mut cmd = self.command();
        cmd.args(args);
        let output = self.output(cmd, format!("git {}", args.join(" "))).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Initializes the repository (idempotent) with `main` as the current branch.
    pub async fn init_main(&self) -> GitResult<()> {
        self.run(&["init", "--quiet"]).await?;
        self.run(&["symbolic-ref", "HEAD", "refs/heads/main"]).await?;
        Ok(())
    }

    /// Stages everything and commits, even when nothing changed.
    pub async fn commit_all(
        &self,
        message: &str,
        identity: &CommitIdentity,
    ) -> GitResult<CommitSha> {
        self.run(&["add", "-A"]).await?;

        let mut cmd = self.command();
        cmd.arg("-c")
            .arg(format!("user.name={}", identity.name))
            .arg("-c")
            .arg(format!("user.email={}", identity.email))
            .arg("-c")
            .arg("commit.gpgsign=false")
            .args(["commit", "--quiet", "--allow-empty", "-m", message]);
        self.output(cmd, format!("git commit -m {message:?}")).await?;

        self.head().await
    }

    /// Returns the commit at `HEAD`.
    pub async fn head(&self) -> GitResult<CommitSha> {
        let sha = self.run(&["rev-parse", "HEAD"]).await?;
        Ok(CommitSha::parse(sha)?)
    }

    /// Force-pushes `HEAD` to `main` on `owner/repo` at `remote`.
    pub async fn force_push_main(
        &self,
        remote: &GitRemote,
        owner: &str,
        repo: &str,
    ) -> GitResult<()> {
        let url = remote.url_for(owner, repo);
        let mut cmd = self.command();
        cmd.args(["push", "--force", "--quiet", &url, "HEAD:refs/heads/main"]);
        let display = format!("git push --force {} HEAD:refs/heads/main", remote.redact(&url));

        self.output(cmd, display).await.map(|_| ()).map_err(|e| match e {
            GitError::CommandFailed { command, stderr } => GitError::CommandFailed {
                command,
                stderr: remote.redact(&stderr),
            },
            other => other,
        })
    }
}
