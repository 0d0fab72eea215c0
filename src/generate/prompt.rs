//! Prompts for the content model.

use serde::{Deserialize, Serialize};

use super::SiteRequest;

const SYSTEM_PROMPT: &str = "You are an expert front-end developer. \
Generate a complete, self-contained HTML5 file that runs offline. \
All JavaScript must be in ONE <script> tag inside <body>. \
All CSS must be in ONE <style> tag inside <head>. \
No external dependencies, no CDNs, no imports. \
Output ONLY the complete HTML file - no markdown, no code fences, no explanations.";

const README_SYSTEM_PROMPT: &str = "You are an expert open-source documentation writer. \
Write a concise but complete README.md for a GitHub repository. \
It should include: a summary, setup instructions, usage guide, short code explanation, \
and license notice. Use clean Markdown. Keep it professional and easy to read.";

/// A system/user prompt pair sent to a [`ContentModel`](super::ContentModel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds the prompt for a generation request.
///
/// Round 1 asks for a fresh document. Later rounds with an existing document
/// ask for an in-place update that keeps prior functionality.
pub fn build_prompt(request: &SiteRequest<'_>, existing_html: Option<&str>) -> Prompt {
    let asset_note = match request.fallback_asset {
        Some(asset) => format!(
            "\n- An image file named `{asset}` sits next to index.html; use it where it fits"
        ),
        None => String::new(),
    };

    let user = match existing_html {
        Some(existing) if request.round > 1 => format!(
            "Update the existing HTML file based on new requirements:\n\n\
             Title: {task}\n\
             New Requirements: {brief}\n\n\
             EXISTING HTML:\n{existing}\n\n\
             CRITICAL RULES:\n\
             - Output ONLY the COMPLETE updated HTML file (no ```html or ``` markers)\n\
             - Keep ALL existing functionality unless the brief explicitly asks to remove it\n\
             - Add/modify features as requested in the brief\n\
             - Maintain the same structure (CSS in <head>, JS in <body>)\n\
             - No external resources (CDNs, imports, etc.){asset_note}\n",
            task = request.task,
            brief = request.brief,
        ),
        _ => format!(
            "Create a complete HTML file for this project:\n\n\
             Title: {task}\n\
             Requirements: {brief}\n\n\
             CRITICAL RULES:\n\
             - Output ONLY raw HTML (no ```html or ``` markers)\n\
             - Include <!DOCTYPE html> declaration\n\
             - All CSS in <style> tag in <head>\n\
             - All JavaScript in <script> tag at end of <body>\n\
             - Make it functional and visually appealing\n\
             - No external resources (CDNs, imports, etc.){asset_note}\n",
            task = request.task,
            brief = request.brief,
        ),
    };

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Builds the prompt asking the model to write or update `README.md`.
pub fn build_readme_prompt(request: &SiteRequest<'_>, existing_readme: Option<&str>) -> Prompt {
    let brief = if request.brief.is_empty() {
        "(No description provided)"
    } else {
        request.brief
    };

    let user = format!(
        "Repository name: {task}\n\
         Project description or brief: {brief}\n\
         Round: {round}\n\
         License: MIT\n\n\
         Existing README content:\n{existing}\n\n\
         Update the README.md to reflect the current requirements, \
         preserving existing content where appropriate. \
         Output ONLY the Markdown, with no code fences.\n",
        task = request.task,
        round = request.round,
        existing = existing_readme.unwrap_or("(No existing README)"),
    );

    Prompt {
        system: README_SYSTEM_PROMPT.to_string(),
        user,
    }
}
