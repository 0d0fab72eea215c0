//! Outbound result notification body.

use serde::{Deserialize, Serialize};

use super::ids::{CommitSha, RepoName};
use super::task::TaskRequest;

/// The result reported to a task's `evaluation_url`.
///
/// `commit_sha` and `pages_url` are `null` when publishing failed: the task was
/// attempted but produced no deployable commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: Option<CommitSha>,
    pub pages_url: Option<String>,
}

impl ResultPayload {
    /// Builds the payload for a task, echoing its identifying fields.
    pub fn for_task(
        task: &TaskRequest,
        owner: &str,
        repo: &RepoName,
        commit_sha: Option<CommitSha>,
        pages_url: Option<String>,
    ) -> Self {
        ResultPayload {
            email: task.email.clone(),
            task: task.task.clone(),
            round: task.round,
            nonce: task.nonce.clone(),
            repo_url: repo_url(owner, repo),
            commit_sha,
            pages_url,
        }
    }

    /// Returns true if the payload reports a successful publish.
    pub fn is_published(&self) -> bool {
        self.commit_sha.is_some()
    }
}

/// The public web URL of a repository.
pub fn repo_url(owner: &str, repo: &RepoName) -> String {
    format!("https://github.com/{}/{}", owner, repo)
}

/// The GitHub Pages URL of a repository. Pages hosts are always lower-case.
pub fn pages_url(owner: &str, repo: &RepoName) -> String {
    format!("https://{}.github.io/{}/", owner.to_lowercase(), repo)
}
