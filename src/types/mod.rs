//! Core domain types for the task pipeline.

mod ids;
mod payload;
mod task;

pub use ids::{CommitSha, InvalidRepoName, InvalidSha, RepoName};
pub use payload::{ResultPayload, pages_url, repo_url};
pub use task::{Attachment, TaskRequest};
