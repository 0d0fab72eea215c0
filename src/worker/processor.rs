//! Drives one task through the pipeline.
//!
//! Stages run strictly in order: working folder, attachments, generation,
//! publish, notification. Every failure after the task name is validated
//! degrades the result instead of dropping it: without an artifact there is
//! nothing to publish, and the caller is told so through null fields.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use thiserror::Error;
use tracing::{error, info, instrument};

use super::queue::ProcessTask;
use crate::attachments::resolve_attachments;
use crate::generate::{Artifact, ContentModel, GenerateError, SiteGenerator, SiteRequest};
use crate::http::HttpClient;
use crate::notify::{Notifier, NotifyOutcome};
use crate::publish::{Published, Publisher};
use crate::types::{InvalidRepoName, RepoName, ResultPayload, TaskRequest};

/// Errors from the processing stages.
///
/// Only [`ProcessError::InvalidTaskName`] is returned from
/// [`TaskProcessor::process`]; the others skip publishing and are logged.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    InvalidTaskName(#[from] InvalidRepoName),

    #[error("failed to prepare working folder {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write site artifact: {0}")]
    Generate(#[from] GenerateError),
}

/// Everything a finished task produced.
#[derive(Debug)]
pub struct TaskOutcome {
    pub repo: RepoName,
    /// `None` when the working folder or the site files could not be written.
    pub artifact: Option<Artifact>,
    pub published: Option<Published>,
    pub payload: ResultPayload,
    pub notification: NotifyOutcome,
}

/// The pipeline for one task at a time.
pub struct TaskProcessor<M, P, H> {
    workspace_root: PathBuf,
    owner: String,
    generator: SiteGenerator<M>,
    publisher: P,
    http: H,
    notifier: Notifier<H>,
}

impl<M, P, H> TaskProcessor<M, P, H>
where
    M: ContentModel,
    P: Publisher,
    H: HttpClient + Clone,
{
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        owner: impl Into<String>,
        generator: SiteGenerator<M>,
        publisher: P,
        http: H,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            owner: owner.into(),
            generator,
            publisher,
            notifier: Notifier::with_default_policy(http.clone()),
            http,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier<H>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Runs every stage for `task` and reports the result to its callback.
    #[instrument(
        skip(self, task),
        fields(task = %task.task, round = task.round, nonce = %task.nonce)
    )]
    pub async fn process(&self, task: TaskRequest) -> Result<TaskOutcome, ProcessError> {
        let repo = task.repo_name().inspect_err(|e| {
            error!(error = %e, "Abandoning task with unusable name");
        })?;

        let folder = self.workspace_root.join(repo.as_str());
        let artifact = match self.build_artifact(&folder, &task).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                error!(%repo, error = %e, "No site artifact, skipping publish");
                None
            }
        };

        let published = if artifact.is_some() {
            self.publish(&repo, &folder, task.brief()).await
        } else {
            None
        };

        let payload = ResultPayload::for_task(
            &task,
            &self.owner,
            &repo,
            published.as_ref().map(|p| p.commit_sha.clone()),
            published.as_ref().map(|p| p.pages_url.clone()),
        );
        let notification = self.notifier.notify(&task.evaluation_url, &payload).await;

        info!(
            %repo,
            degraded = artifact.as_ref().is_none_or(Artifact::is_degraded),
            published = published.is_some(),
            delivered = notification.is_delivered(),
            "Task complete"
        );

        Ok(TaskOutcome {
            repo,
            artifact,
            published,
            payload,
            notification,
        })
    }

    /// Prepares the working folder and writes the site into it.
    async fn build_artifact(
        &self,
        folder: &Path,
        task: &TaskRequest,
    ) -> Result<Artifact, ProcessError> {
        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|source| ProcessError::Workspace {
                path: folder.to_path_buf(),
                source,
            })?;

        let saved = resolve_attachments(&self.http, folder, &task.attachments).await;

        let request = SiteRequest {
            task: &task.task,
            brief: task.brief(),
            fallback_asset: saved.first().map(String::as_str),
            round: task.round,
        };
        Ok(self.generator.generate(folder, &request).await?)
    }

    /// Publishes, turning both errors and panics into `None`.
    async fn publish(&self, repo: &RepoName, folder: &Path, brief: &str) -> Option<Published> {
        let attempt = AssertUnwindSafe(self.publisher.publish(repo, folder, brief))
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(published)) => Some(published),
            Ok(Err(e)) => {
                error!(%repo, error = %e, "Publish failed");
                None
            }
            Err(panic) => {
                error!(%repo, panic = crate::panic_message(panic.as_ref()), "Publish panicked");
                None
            }
        }
    }
}

impl<M, P, H> ProcessTask for TaskProcessor<M, P, H>
where
    M: ContentModel + 'static,
    P: Publisher + 'static,
    H: HttpClient + Clone + 'static,
{
    type Output = TaskOutcome;
    type Error = ProcessError;

    async fn process(&self, task: TaskRequest) -> Result<TaskOutcome, ProcessError> {
        TaskProcessor::process(self, task).await
    }
}
