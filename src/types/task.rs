//! Inbound task submissions.

use serde::{Deserialize, Serialize};

use super::ids::{InvalidRepoName, RepoName};

/// A file to materialize in the task's working folder before generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name inside the working folder.
    pub name: String,

    /// Either a `data:<mime>;base64,<payload>` URI or a remote URL to fetch.
    pub url: String,
}

/// A submitted unit of site-generation work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Notification target metadata, echoed in the result payload.
    pub email: String,

    /// Shared secret. Checked at intake only; the pipeline never reads it.
    pub secret: String,

    /// Task identifier, also used as the human-readable site title.
    pub task: String,

    /// Generation iteration. Round 1 creates the site, later rounds update it.
    pub round: u32,

    /// Caller correlation token, passed through unmodified.
    pub nonce: String,

    /// Free-text instructions for content generation.
    #[serde(default)]
    pub brief: Option<String>,

    /// Evaluation checks. Carried through but not interpreted.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checks: Vec<String>,

    /// Callback URL that receives the [`ResultPayload`](super::ResultPayload).
    pub evaluation_url: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
}

impl TaskRequest {
    /// Derives the deterministic repository name for this task.
    pub fn repo_name(&self) -> Result<RepoName, InvalidRepoName> {
        RepoName::from_task(&self.task)
    }

    /// Returns the brief, or an empty string when none was supplied.
    pub fn brief(&self) -> &str {
        self.brief.as_deref().unwrap_or("")
    }
}

/// Accepts both a missing field and an explicit `null` for optional lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
