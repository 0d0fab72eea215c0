//! HTML cleanup, structural validation and the degraded fallback document.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Marker identifying a fallback document.
pub const FALLBACK_MARKER: &str = r#"<meta name="generation-status" content="fallback">"#;

static LEADING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^```(?:html|javascript|js|markdown|md)?[ \t]*\r?\n?").expect("valid regex")
});

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?```\s*$").expect("valid regex"));

static DOCUMENT_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype\s+html|<html[\s>]").expect("valid regex"));

static HTML_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html[\s>]").expect("valid regex"));

static HEAD_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head[\s>]").expect("valid regex"));

static BODY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[\s>]").expect("valid regex"));

/// Why a document failed the structural check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("document is empty")]
    Empty,

    #[error("document has no <!DOCTYPE html> or <html> opener")]
    MissingOpener,

    #[error("document is missing <{0}>")]
    MissingElement(&'static str),

    #[error("document is missing </{0}>")]
    Unclosed(&'static str),

    #[error("<{0}> is out of order")]
    OutOfOrder(&'static str),
}

/// Strips markdown code fences and surrounding whitespace from model output.
pub fn clean_model_output(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    let without_trailing = TRAILING_FENCE.replace(&without_leading, "");
    without_trailing.trim().to_string()
}

/// Checks that `html` is a complete document.
///
/// Requires a doctype or `<html>` opener, and `<html>` and `<body>` each
/// opened and closed, with the body inside the document. `<head>` may be
/// omitted; when present it must close before `<body>` opens.
pub fn validate_document(html: &str) -> Result<(), StructureError> {
    if html.trim().is_empty() {
        return Err(StructureError::Empty);
    }
    if !DOCUMENT_OPENER.is_match(html) {
        return Err(StructureError::MissingOpener);
    }

    let lower = html.to_ascii_lowercase();
    let document = element_span(&lower, &HTML_OPEN, "html")?;
    let body = element_span(&lower, &BODY_OPEN, "body")?;

    if body.0 < document.0 || body.1 > document.1 {
        return Err(StructureError::OutOfOrder("body"));
    }

    if HEAD_OPEN.is_match(&lower) {
        let head = element_span(&lower, &HEAD_OPEN, "head")?;
        if head.0 < document.0 || head.1 > body.0 {
            return Err(StructureError::OutOfOrder("head"));
        }
    }

    Ok(())
}

/// Position of the first opener and last closer of `element`.
fn element_span(
    lower: &str,
    opener: &Regex,
    element: &'static str,
) -> Result<(usize, usize), StructureError> {
    let open = opener
        .find(lower)
        .map(|m| m.start())
        .ok_or(StructureError::MissingElement(element))?;
    let close = lower
        .rfind(&format!("</{element}>"))
        .ok_or(StructureError::Unclosed(element))?;
    if close < open {
        return Err(StructureError::OutOfOrder(element));
    }
    Ok((open, close))
}

/// Escapes text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds the deterministic fallback page shown when generation fails.
///
/// The page carries [`FALLBACK_MARKER`] so degraded output is detectable.
pub fn fallback_document(task: &str, brief: &str, fallback_asset: Option<&str>) -> String {
    let title = escape_html(task);
    let brief = escape_html(brief);
    let image = match fallback_asset {
        Some(asset) => format!(
            "\n        <img src=\"{}\" alt=\"Attachment preview\" />",
            escape_html(asset)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    {FALLBACK_MARKER}
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; background: #f5f5f5; }}
        .container {{ background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
        .notice {{ color: #8a6d3b; background: #fcf8e3; padding: 8px 12px; border-radius: 4px; }}
        h1 {{ color: #333; }}
        img {{ max-width: 100%; height: auto; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <p class="notice">Fallback mode: automated generation was unavailable for this round.</p>
        <p>{brief}</p>{image}
    </div>
    <script>
        console.log('Fallback mode - AI generation failed');
    </script>
</body>
</html>
"#
    )
}

/// Returns true if `html` was produced by [`fallback_document`].
pub fn is_fallback_document(html: &str) -> bool {
    html.contains(FALLBACK_MARKER)
}
