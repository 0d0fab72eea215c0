//! Site content generation.
//!
//! A [`SiteGenerator`] asks a [`ContentModel`] for a complete HTML document,
//! cleans and validates the answer, and writes `index.html` and `README.md`
//! into the working folder. Model failures never fail a task: a deterministic
//! fallback document is written instead and the artifact is marked degraded.

mod html;
mod openai;
mod prompt;
mod readme;

use std::future::Future;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use html::{
    FALLBACK_MARKER, StructureError, clean_model_output, escape_html, fallback_document,
    is_fallback_document, validate_document,
};
pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiModel};
pub use prompt::{Prompt, build_prompt, build_readme_prompt};
pub use readme::{render_readme, script_function_names};

pub const INDEX_FILE: &str = "index.html";
pub const README_FILE: &str = "README.md";

/// Errors from content generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Missing API key or invalid model settings.
    #[error("model configuration error: {0}")]
    Config(String),

    /// Connection failure or timeout talking to the model.
    #[error("model network error: {0}")]
    Network(String),

    /// The model API answered with an error.
    #[error("model API error: {0}")]
    Api(String),

    /// The model response could not be decoded.
    #[error("model response parse error: {0}")]
    Parse(String),

    /// The model panicked while producing a completion.
    #[error("model panicked: {0}")]
    Panicked(String),

    /// The model returned nothing usable.
    #[error("model returned an empty response")]
    Empty,

    /// The model produced something that is not a complete document.
    #[error("generated document rejected: {0}")]
    Invalid(#[from] StructureError),

    /// Reading or writing the working folder failed.
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A text-completion backend.
pub trait ContentModel: Send + Sync {
    fn complete(
        &self,
        prompt: &Prompt,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

/// What to generate for one task round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteRequest<'a> {
    pub task: &'a str,
    pub brief: &'a str,
    /// First successfully resolved attachment, shown by the fallback page.
    pub fallback_asset: Option<&'a str>,
    pub round: u32,
}

/// How the artifact was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    Generated,
    Fallback { reason: String },
}

/// The files written for a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub index_path: PathBuf,
    pub readme_path: PathBuf,
}

impl Artifact {
    pub fn is_degraded(&self) -> bool {
        matches!(self.kind, ArtifactKind::Fallback { .. })
    }
}

/// Generates site artifacts with a [`ContentModel`], falling back to a
/// deterministic page when the model cannot deliver a valid document.
#[derive(Debug, Clone)]
pub struct SiteGenerator<M> {
    model: M,
    readme_from_model: bool,
}

impl<M: ContentModel> SiteGenerator<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            readme_from_model: false,
        }
    }

    /// Also asks the model to write `README.md` for generated documents.
    /// The rendered README is used whenever the model cannot deliver one.
    pub fn with_model_readme(mut self) -> Self {
        self.readme_from_model = true;
        self
    }

    /// Runs one completion, turning a panicking model into an error.
    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerateError> {
        match AssertUnwindSafe(self.model.complete(prompt)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(GenerateError::Panicked(
                crate::panic_message(panic.as_ref()).to_string(),
            )),
        }
    }

    async fn model_document(&self, prompt: &Prompt) -> Result<String, GenerateError> {
        let raw = self.complete(prompt).await?;
        let cleaned = clean_model_output(&raw);
        validate_document(&cleaned)?;
        Ok(cleaned)
    }

    async fn model_readme(&self, prompt: &Prompt) -> Result<String, GenerateError> {
        let raw = self.complete(prompt).await?;
        let cleaned = clean_model_output(&raw);
        if cleaned.is_empty() {
            return Err(GenerateError::Empty);
        }
        Ok(cleaned)
    }

    async fn readme(
        &self,
        readme_path: &Path,
        request: &SiteRequest<'_>,
        html: &str,
        degraded: bool,
    ) -> Result<String, GenerateError> {
        let rendered = || render_readme(request.task, request.brief, request.round, html, degraded);
        if !self.readme_from_model || degraded {
            return Ok(rendered());
        }

        let existing = if request.round > 1 {
            read_existing(readme_path).await?
        } else {
            None
        };
        let prompt = build_readme_prompt(request, existing.as_deref());
        match self.model_readme(&prompt).await {
            Ok(readme) => Ok(readme),
            Err(e) => {
                warn!(error = %e, "README generation failed, rendering default README");
                Ok(rendered())
            }
        }
    }

    /// Writes `index.html` and `README.md` into `folder`.
    ///
    /// Only I/O failures are returned as errors.
    #[instrument(skip(self, request), fields(task = %request.task, round = request.round))]
    pub async fn generate(
        &self,
        folder: &Path,
        request: &SiteRequest<'_>,
    ) -> Result<Artifact, GenerateError> {
        let index_path = folder.join(INDEX_FILE);
        let readme_path = folder.join(README_FILE);

        let existing = if request.round > 1 {
            read_existing(&index_path).await?
        } else {
            None
        };
        if let Some(existing) = &existing {
            debug!(bytes = existing.len(), "Updating existing document");
        }

        let prompt = build_prompt(request, existing.as_deref());
        let (html, kind) = match self.model_document(&prompt).await {
            Ok(html) => (html, ArtifactKind::Generated),
            Err(e) => {
                warn!(error = %e, "Generation failed, writing fallback document");
                let html = fallback_document(request.task, request.brief, request.fallback_asset);
                (
                    html,
                    ArtifactKind::Fallback {
                        reason: e.to_string(),
                    },
                )
            }
        };

        let degraded = matches!(kind, ArtifactKind::Fallback { .. });
        tokio::fs::write(&index_path, &html).await?;
        let readme = self.readme(&readme_path, request, &html, degraded).await?;
        tokio::fs::write(&readme_path, readme).await?;

        info!(degraded, bytes = html.len(), "Artifact written");
        Ok(Artifact {
            kind,
            index_path,
            readme_path,
        })
    }
}

async fn read_existing(path: &Path) -> Result<Option<String>, std::io::Error> {
    match tokio::fs::read_to_string(path).await {
        Ok(html) => Ok(Some(html)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
