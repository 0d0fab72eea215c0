//! Newtype wrappers for pipeline identifiers.
//!
//! These types keep a task's derived repository name and a published commit id
//! from being confused with arbitrary strings, and carry their validation with them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a task identifier does not yield a usable repository name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task identifier {task:?} does not yield a valid repository name")]
pub struct InvalidRepoName {
    pub task: String,
}

/// The repository (and working folder) name derived from a task identifier.
///
/// Derivation is deterministic: the task identifier is trimmed, lower-cased and
/// every space is replaced with a hyphen. Nothing else about a request (round,
/// nonce, attachments) influences the name, so every round of the same task
/// lands in the same folder and the same remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(String);

impl RepoName {
    /// Derives the repository name for a task identifier.
    ///
    /// Fails for names that could escape the workspace root when used as a
    /// directory component (empty, `.`, `..`, or containing a path separator).
    pub fn from_task(task: &str) -> Result<Self, InvalidRepoName> {
        let name = task.trim().to_lowercase().replace(' ', "-");

        let invalid =
            name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(InvalidRepoName {
                task: task.to_string(),
            });
        }

        Ok(RepoName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<std::path::Path> for RepoName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

/// Error returned when a string is not a full 40-character hex commit id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid commit SHA: {0:?}")]
pub struct InvalidSha(pub String);

/// A git commit SHA (40 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    /// Parses a commit SHA, normalizing to lowercase.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, InvalidSha> {
        let s = s.as_ref().trim();
        if s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(CommitSha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
