//! GitHub-backed publisher.
//!
//! Repository and Pages management go through the [`RepositoryHost`] trait so
//! the publish sequence can run against an in-memory host in tests.
//! [`OctocrabHost`] is the production implementation.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use octocrab::Octocrab;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::git::{CommitIdentity, DEFAULT_GIT_TIMEOUT, Git, GitRemote};
use super::{GitHubApiError, PublishError, Published, Publisher, files};
use crate::http::HttpClient;
use crate::liveness::{LivenessConfig, wait_until_live};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::types::{RepoName, pages_url};

/// Result of asking GitHub to serve a repository with Pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesActivation {
    Enabled,
    AlreadyEnabled,
}

/// Repository and Pages operations on the hosting account.
pub trait RepositoryHost: Send + Sync {
    /// Returns whether `owner/repo` exists.
    fn repository_exists(
        &self,
        owner: &str,
        repo: &RepoName,
    ) -> impl Future<Output = Result<bool, GitHubApiError>> + Send;

    /// Creates a public, empty repository for the authenticated user.
    /// An "already exists" answer counts as success.
    fn create_repository(
        &self,
        repo: &RepoName,
        description: &str,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;

    /// Enables Pages from the root of `main`.
    fn enable_pages(
        &self,
        owner: &str,
        repo: &RepoName,
    ) -> impl Future<Output = Result<PagesActivation, GitHubApiError>> + Send;
}

/// [`RepositoryHost`] backed by octocrab. Every call runs under a timeout.
#[derive(Clone)]
pub struct OctocrabHost {
    client: Octocrab,
    timeout: Duration,
}

impl std::fmt::Debug for OctocrabHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabHost")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
    description: &'a str,
}

#[derive(Serialize)]
struct PagesSource {
    branch: &'static str,
    path: &'static str,
}

#[derive(Serialize)]
struct EnablePagesRequest {
    source: PagesSource,
    build_type: &'static str,
}

impl OctocrabHost {
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(30),
        }
    }

    /// Creates a host authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn timed<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, octocrab::Error>>,
    ) -> Result<T, GitHubApiError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(GitHubApiError::from_octocrab),
            Err(_) => Err(GitHubApiError::timed_out(operation, self.timeout)),
        }
    }
}

impl RepositoryHost for OctocrabHost {
    async fn repository_exists(
        &self,
        owner: &str,
        repo: &RepoName,
    ) -> Result<bool, GitHubApiError> {
        let url = format!("/repos/{owner}/{repo}");
        let result: Result<serde_json::Value, _> = self
            .timed("get repository", self.client.get(&url, None::<&()>))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_repository(
        &self,
        repo: &RepoName,
        description: &str,
    ) -> Result<(), GitHubApiError> {
        let request = CreateRepoRequest {
            name: repo.as_str(),
            private: false,
            auto_init: false,
            description,
        };
        let result: Result<serde_json::Value, _> = self
            .timed("create repository", self.client.post("/user/repos", Some(&request)))
            .await;

        match result {
            Ok(_) => {
                info!(%repo, "Created repository");
                Ok(())
            }
            Err(e) if e.status_code == Some(422) => {
                info!(%repo, "Repository already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn enable_pages(
        &self,
        owner: &str,
        repo: &RepoName,
    ) -> Result<PagesActivation, GitHubApiError> {
        let url = format!("/repos/{owner}/{repo}/pages");
        let request = EnablePagesRequest {
            source: PagesSource {
                branch: "main",
                path: "/",
            },
            build_type: "legacy",
        };
        let result: Result<serde_json::Value, _> = self
            .timed("enable pages", self.client.post(&url, Some(&request)))
            .await;

        match result {
            Ok(_) => Ok(PagesActivation::Enabled),
            Err(e) if e.status_code == Some(409) => Ok(PagesActivation::AlreadyEnabled),
            Err(e) => Err(e),
        }
    }
}

/// Publishes working folders as GitHub repositories served by Pages.
#[derive(Debug, Clone)]
pub struct GitHubPublisher<G, H> {
    host: G,
    http: H,
    owner: String,
    remote: GitRemote,
    identity: CommitIdentity,
    git_timeout: Duration,
    api_policy: RetryPolicy,
    liveness: LivenessConfig,
}

impl<G: RepositoryHost, H: HttpClient> GitHubPublisher<G, H> {
    pub fn new(host: G, http: H, owner: impl Into<String>, remote: GitRemote) -> Self {
        let owner = owner.into();
        Self {
            host,
            http,
            identity: CommitIdentity::for_owner(&owner),
            owner,
            remote,
            git_timeout: DEFAULT_GIT_TIMEOUT,
            api_policy: RetryPolicy::GITHUB_API,
            liveness: LivenessConfig::default(),
        }
    }

    pub fn with_identity(mut self, identity: CommitIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    pub fn with_api_policy(mut self, policy: RetryPolicy) -> Self {
        self.api_policy = policy;
        self
    }

    pub fn with_liveness(mut self, liveness: LivenessConfig) -> Self {
        self.liveness = liveness;
        self
    }

    async fn ensure_repository(
        &self,
        repo: &RepoName,
        description: &str,
    ) -> Result<(), GitHubApiError> {
        retry_with_backoff(&self.api_policy, |attempt| async move {
            if self.host.repository_exists(&self.owner, repo).await? {
                return Ok(());
            }
            info!(%repo, attempt, "Repository missing, creating");
            self.host.create_repository(repo, description).await
        })
        .await
        .into_result()
    }

    async fn enable_pages(&self, repo: &RepoName) {
        let outcome = retry_with_backoff(&self.api_policy, |_| {
            self.host.enable_pages(&self.owner, repo)
        })
        .await
        .into_result();

        match outcome {
            Ok(PagesActivation::Enabled) => info!(%repo, "Pages enabled"),
            Ok(PagesActivation::AlreadyEnabled) => info!(%repo, "Pages already enabled"),
            Err(e) => warn!(%repo, error = %e, "Could not enable Pages"),
        }
    }
}

fn description_for(repo: &RepoName, brief: &str) -> String {
    let summary: String = brief.chars().take(100).collect();
    if summary.is_empty() {
        format!("Generated site for {repo}")
    } else {
        summary
    }
}

impl<G: RepositoryHost, H: HttpClient> Publisher for GitHubPublisher<G, H> {
    #[instrument(skip(self, folder, brief), fields(owner = %self.owner))]
    async fn publish(
        &self,
        repo: &RepoName,
        folder: &Path,
        brief: &str,
    ) -> Result<Published, PublishError> {
        self.ensure_repository(repo, &description_for(repo, brief)).await?;
        files::ensure_repo_files(folder, &self.owner, repo.as_str(), brief).await?;

        let git = Git::new(folder, self.git_timeout);
        git.init_main().await?;
        let commit_sha = git
            .commit_all(&format!("Round update: {repo}"), &self.identity)
            .await?;
        git.force_push_main(&self.remote, &self.owner, repo.as_str())
            .await?;
        info!(%repo, sha = %commit_sha.short(), "Pushed to main");

        self.enable_pages(repo).await;

        let pages_url = pages_url(&self.owner, repo);
        wait_until_live(&self.http, &pages_url, &self.liveness).await;

        Ok(Published {
            commit_sha,
            pages_url,
        })
    }
}
