//! Shared fakes and fixtures for unit tests.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::time::Instant;

use crate::generate::{ContentModel, GenerateError, Prompt};
use crate::http::{HttpClient, HttpError};
use crate::publish::{
    GitHubApiError, PagesActivation, PublishError, Published, Publisher, RepositoryHost,
};
use crate::types::{CommitSha, RepoName, ResultPayload, TaskRequest, pages_url};

pub const VALID_HTML: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n\
<head><title>Landing</title></head>\n<body><h1>Hello</h1></body>\n</html>";

pub fn sample_task() -> TaskRequest {
    TaskRequest {
        email: "student@example.com".to_string(),
        secret: "s3cret".to_string(),
        task: "landing-page".to_string(),
        round: 1,
        nonce: "nonce-1".to_string(),
        brief: Some("Build a landing page".to_string()),
        checks: vec!["Page has a title".to_string()],
        evaluation_url: "https://eval.example.com/notify".to_string(),
        attachments: Vec::new(),
    }
}

pub fn sample_payload() -> ResultPayload {
    let task = sample_task();
    let repo = RepoName::from_task(&task.task).unwrap();
    ResultPayload::for_task(
        &task,
        "octocat",
        &repo,
        Some(CommitSha::parse("a".repeat(40)).unwrap()),
        Some(pages_url("octocat", &repo)),
    )
}

// ─── HTTP ───────────────────────────────────────────────────────────────────

/// A POST seen by [`ScriptedHttp`].
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub url: String,
    pub body: serde_json::Value,
    pub at: Instant,
}

#[derive(Debug)]
enum Script {
    Always(StatusCode),
    /// Played in order; the last entry repeats. `Err(())` is a transport failure.
    Sequence(VecDeque<Result<StatusCode, ()>>),
}

#[derive(Debug)]
struct HttpState {
    script: Script,
    body: Vec<u8>,
    posts: Vec<RecordedPost>,
    gets: usize,
}

/// In-memory [`HttpClient`] answering from a script. Clones share state.
#[derive(Debug, Clone)]
pub struct ScriptedHttp {
    state: Arc<Mutex<HttpState>>,
}

impl ScriptedHttp {
    fn with_script(script: Script) -> Self {
        Self {
            state: Arc::new(Mutex::new(HttpState {
                script,
                body: Vec::new(),
                posts: Vec::new(),
                gets: 0,
            })),
        }
    }

    pub fn always(status: StatusCode) -> Self {
        Self::with_script(Script::Always(status))
    }

    pub fn sequence(responses: Vec<Result<StatusCode, ()>>) -> Self {
        Self::with_script(Script::Sequence(responses.into()))
    }

    /// Body returned by successful `get_bytes` calls.
    pub fn with_body(self, body: Vec<u8>) -> Self {
        self.state.lock().unwrap().body = body;
        self
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn post_count(&self) -> usize {
        self.state.lock().unwrap().posts.len()
    }

    /// Time between consecutive POSTs.
    pub fn post_gaps(&self) -> Vec<Duration> {
        self.posts()
            .windows(2)
            .map(|pair| pair[1].at - pair[0].at)
            .collect()
    }

    pub fn get_count(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    fn next(state: &mut HttpState, url: &str) -> Result<StatusCode, HttpError> {
        let next = match &mut state.script {
            Script::Always(status) => Ok(*status),
            Script::Sequence(queue) if queue.len() > 1 => {
                queue.pop_front().unwrap_or(Ok(StatusCode::OK))
            }
            Script::Sequence(queue) => queue.front().copied().unwrap_or(Ok(StatusCode::OK)),
        };
        next.map_err(|()| HttpError::Transport {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

impl HttpClient for ScriptedHttp {
    async fn post_json<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<StatusCode, HttpError> {
        let mut state = self.state.lock().unwrap();
        state.posts.push(RecordedPost {
            url: url.to_string(),
            body: serde_json::to_value(body).unwrap(),
            at: Instant::now(),
        });
        Self::next(&mut state, url)
    }

    async fn get_status(&self, url: &str) -> Result<StatusCode, HttpError> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        Self::next(&mut state, url)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        let status = Self::next(&mut state, url)?;
        if status.is_success() {
            Ok(state.body.clone())
        } else {
            Err(HttpError::Status {
                url: url.to_string(),
                status,
            })
        }
    }
}

// ─── Content model ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail,
    Panic,
}

#[derive(Debug)]
struct ModelState {
    replies: VecDeque<Reply>,
    prompts: Vec<Prompt>,
}

/// [`ContentModel`] that plays back scripted replies and records prompts.
///
/// The last reply repeats once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    state: Arc<Mutex<ModelState>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ModelState {
                replies: replies.into(),
                prompts: Vec::new(),
            })),
        }
    }

    pub fn replying(reply: impl Into<String>) -> Self {
        Self::new(vec![Reply::Text(reply.into())])
    }

    /// Replies with each entry in turn; `None` is a failed completion.
    pub fn sequence(replies: Vec<Option<&str>>) -> Self {
        Self::new(
            replies
                .into_iter()
                .map(|r| r.map_or(Reply::Fail, |text| Reply::Text(text.to_string())))
                .collect(),
        )
    }

    pub fn failing() -> Self {
        Self::new(vec![Reply::Fail])
    }

    pub fn panicking() -> Self {
        Self::new(vec![Reply::Panic])
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.state.lock().unwrap().prompts.clone()
    }
}

impl ContentModel for ScriptedModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerateError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.prompts.push(prompt.clone());
            if state.replies.len() > 1 {
                state.replies.pop_front()
            } else {
                state.replies.front().cloned()
            }
        };
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Panic) => panic!("model exploded"),
            Some(Reply::Fail) | None => {
                Err(GenerateError::Network("model unreachable".to_string()))
            }
        }
    }
}

// ─── Publisher ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum PublishMode {
    Succeed { owner: String },
    Fail,
    Panic,
}

/// [`Publisher`] that succeeds, fails or panics on every call, recording calls.
#[derive(Debug, Clone)]
pub struct FakePublisher {
    mode: PublishMode,
    calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl FakePublisher {
    fn new(mode: PublishMode) -> Self {
        Self {
            mode,
            calls: Arc::default(),
        }
    }

    pub fn succeeding(owner: &str) -> Self {
        Self::new(PublishMode::Succeed {
            owner: owner.to_string(),
        })
    }

    pub fn failing() -> Self {
        Self::new(PublishMode::Fail)
    }

    pub fn panicking() -> Self {
        Self::new(PublishMode::Panic)
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Publisher for FakePublisher {
    async fn publish(
        &self,
        repo: &RepoName,
        folder: &Path,
        _brief: &str,
    ) -> Result<Published, PublishError> {
        self.calls
            .lock()
            .unwrap()
            .push((repo.to_string(), folder.to_path_buf()));

        match &self.mode {
            PublishMode::Succeed { owner } => Ok(Published {
                commit_sha: CommitSha::parse("a".repeat(40)).unwrap(),
                pages_url: pages_url(owner, repo),
            }),
            PublishMode::Fail => Err(PublishError::GitHub(GitHubApiError::from_status(
                Some(401),
                "Bad credentials",
            ))),
            PublishMode::Panic => panic!("publisher exploded"),
        }
    }
}

// ─── Repository host ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HostState {
    existing: HashSet<String>,
    lookup_failures_left: u32,
    lookup_failure_status: u16,
    pages_failure: Option<u16>,
    created: Vec<String>,
    lookups: u32,
    pages_calls: usize,
}

/// In-memory [`RepositoryHost`].
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self, repo: &str) -> Self {
        self.state.lock().unwrap().existing.insert(repo.to_string());
        self
    }

    /// Fails the next `count` lookups with `status`.
    pub fn failing_lookups(self, count: u32, status: u16) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.lookup_failures_left = count;
            state.lookup_failure_status = status;
        }
        self
    }

    pub fn failing_pages(self, status: u16) -> Self {
        self.state.lock().unwrap().pages_failure = Some(status);
        self
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn lookups(&self) -> u32 {
        self.state.lock().unwrap().lookups
    }

    pub fn pages_calls(&self) -> usize {
        self.state.lock().unwrap().pages_calls
    }
}

impl RepositoryHost for FakeHost {
    async fn repository_exists(
        &self,
        _owner: &str,
        repo: &RepoName,
    ) -> Result<bool, GitHubApiError> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        if state.lookup_failures_left > 0 {
            state.lookup_failures_left -= 1;
            return Err(GitHubApiError::from_status(
                Some(state.lookup_failure_status),
                "scripted lookup failure",
            ));
        }
        Ok(state.existing.contains(repo.as_str()))
    }

    async fn create_repository(
        &self,
        repo: &RepoName,
        _description: &str,
    ) -> Result<(), GitHubApiError> {
        let mut state = self.state.lock().unwrap();
        state.created.push(repo.to_string());
        state.existing.insert(repo.to_string());
        Ok(())
    }

    async fn enable_pages(
        &self,
        _owner: &str,
        _repo: &RepoName,
    ) -> Result<PagesActivation, GitHubApiError> {
        let mut state = self.state.lock().unwrap();
        state.pages_calls += 1;
        match state.pages_failure {
            Some(status) => Err(GitHubApiError::from_status(
                Some(status),
                "scripted pages failure",
            )),
            None => Ok(PagesActivation::Enabled),
        }
    }
}
