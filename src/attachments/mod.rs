//! Materializes task attachments into the working folder.

use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::{HttpClient, HttpError};
use crate::types::Attachment;

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(?P<mime>[^;,]+);base64,(?P<data>.+)$").expect("valid regex")
});

/// Why an attachment could not be materialized.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("invalid attachment name {0:?}")]
    InvalidName(String),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] HttpError),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns the validated file name, or an error if it could escape the folder.
fn validate_name(name: &str) -> Result<&str, AttachmentError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        Err(AttachmentError::InvalidName(name.to_string()))
    } else {
        Ok(name)
    }
}

/// Decodes a `data:<mime>;base64,<payload>` URI. Returns `None` for other URLs.
pub fn decode_data_uri(url: &str) -> Option<Result<Vec<u8>, AttachmentError>> {
    let caps = DATA_URI.captures(url.trim())?;
    let data: String = caps["data"].split_whitespace().collect();
    Some(STANDARD.decode(data).map_err(AttachmentError::from))
}

async fn resolve_one<H: HttpClient>(
    http: &H,
    folder: &Path,
    attachment: &Attachment,
) -> Result<(), AttachmentError> {
    let name = validate_name(&attachment.name)?;

    let bytes = match decode_data_uri(&attachment.url) {
        Some(decoded) => decoded?,
        None => http.get_bytes(&attachment.url).await?,
    };

    tokio::fs::write(folder.join(name), &bytes).await?;
    debug!(name, bytes = bytes.len(), "Attachment saved");
    Ok(())
}

/// Writes each attachment to `folder/<name>` and returns the names that
/// succeeded, in input order. Failures are logged and skipped.
pub async fn resolve_attachments<H: HttpClient>(
    http: &H,
    folder: &Path,
    attachments: &[Attachment],
) -> Vec<String> {
    let mut saved = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        match resolve_one(http, folder, attachment).await {
            Ok(()) => saved.push(attachment.name.clone()),
            Err(e) => warn!(name = %attachment.name, error = %e, "Skipping attachment"),
        }
    }
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedHttp;
    use reqwest::StatusCode;

    fn attachment(name: &str, url: &str) -> Attachment {
        Attachment {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn decodes_data_uri() {
        let bytes = decode_data_uri("data:text/plain;base64,aGVsbG8=").unwrap().unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn non_data_urls_are_not_decoded() {
        assert!(decode_data_uri("https://example.com/logo.png").is_none());
        assert!(decode_data_uri("data:text/plain,hello").is_none());
    }

    #[test]
    fn bad_base64_is_an_error() {
        let result = decode_data_uri("data:image/png;base64,!!!").unwrap();
        assert!(matches!(result, Err(AttachmentError::Decode(_))));
    }

    #[test]
    fn rejects_escaping_names() {
        for name in ["", ".", "..", "../x", "a/b", "a\\b", "x..y"] {
            assert!(validate_name(name).is_err(), "{name:?} should be rejected");
        }
        assert_eq!(validate_name("logo.png").unwrap(), "logo.png");
    }

    #[tokio::test]
    async fn saves_data_and_fetched_attachments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let http = ScriptedHttp::always(StatusCode::OK).with_body(b"remote".to_vec());
        let attachments = vec![
            attachment("a.txt", "data:text/plain;base64,aGVsbG8="),
            attachment("b.bin", "https://example.com/b.bin"),
        ];

        let saved = resolve_attachments(&http, dir.path(), &attachments).await;

        assert_eq!(saved, vec!["a.txt", "b.bin"]);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dir.path().join("b.bin")).unwrap(), b"remote");
        assert_eq!(http.get_count(), 1);
    }

    #[tokio::test]
    async fn failures_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let http = ScriptedHttp::always(StatusCode::NOT_FOUND);
        let attachments = vec![
            attachment("../evil", "data:text/plain;base64,aGVsbG8="),
            attachment("missing.png", "https://example.com/missing.png"),
            attachment("ok.txt", "data:text/plain;base64,aGVsbG8="),
        ];

        let saved = resolve_attachments(&http, dir.path(), &attachments).await;

        assert_eq!(saved, vec!["ok.txt"]);
        assert!(!dir.path().join("missing.png").exists());
    }
}
