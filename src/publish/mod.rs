//! Publishing generated sites.
//!
//! A [`Publisher`] turns a working folder into a hosted site: it makes sure
//! the remote repository exists, commits and pushes the folder to `main`,
//! enables Pages and waits (advisorily) for the site to come up.

mod error;
mod files;
mod git;
mod github;

use std::future::Future;
use std::path::Path;

use thiserror::Error;

use crate::types::{CommitSha, RepoName};

pub use error::{GitHubApiError, GitHubErrorKind};
pub use files::{LICENSE_FILE, default_readme, ensure_repo_files, mit_license};
pub use git::{CommitIdentity, DEFAULT_GIT_TIMEOUT, Git, GitError, GitRemote, GitResult};
pub use github::{GitHubPublisher, OctocrabHost, PagesActivation, RepositoryHost};

/// Errors that stop a publish.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    GitHub(#[from] GitHubApiError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("failed to prepare repository files: {0}")]
    Io(#[from] std::io::Error),
}

/// A successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub commit_sha: CommitSha,
    pub pages_url: String,
}

/// Publishes a working folder under `repo`.
pub trait Publisher: Send + Sync {
    fn publish(
        &self,
        repo: &RepoName,
        folder: &Path,
        brief: &str,
    ) -> impl Future<Output = Result<Published, PublishError>> + Send;
}
