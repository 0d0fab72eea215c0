//! README rendering for generated sites.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").expect("valid regex"));

static FUNCTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").expect("valid regex")
});

/// Maximum number of JavaScript functions listed in the README.
const MAX_LISTED_FUNCTIONS: usize = 5;

/// Returns the names of named JavaScript functions declared in `<script>` blocks.
pub fn script_function_names(html: &str) -> Vec<String> {
    SCRIPT_BODY
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .flat_map(|body| {
            FUNCTION_NAME
                .captures_iter(body.as_str())
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Renders the README that accompanies `index.html`.
pub fn render_readme(task: &str, brief: &str, round: u32, html: &str, degraded: bool) -> String {
    let status = if degraded {
        "Fallback mode (automated generation failed)"
    } else {
        "Successfully generated"
    };
    let overview = if brief.is_empty() {
        "(No description provided)"
    } else {
        brief
    };

    let mut readme = String::new();
    // Writing to a String cannot fail.
    let _ = write!(
        readme,
        "# {task}\n\n## Overview\n{overview}\n\n**Round:** {round}  \n**Status:** {status}\n\n## Features\n"
    );

    if round <= 1 {
        let _ = write!(
            readme,
            "- Initial implementation of {task}\n\
             - Self-contained HTML file with inline CSS and JavaScript\n\
             - No external dependencies\n"
        );
    } else {
        let summary: String = brief.chars().take(100).collect();
        let _ = write!(
            readme,
            "- Enhanced version with updates from round {round}\n\
             - Maintains backward compatibility with previous functionality\n\
             - New features as per requirements: {summary}\n"
        );
    }

    let _ = write!(
        readme,
        "\n## Technical Details\n\
         - **HTML5** with semantic markup\n\
         - **Inline CSS** and **vanilla JavaScript**\n\
         - **No external dependencies**: runs completely offline\n\
         - **File size:** {} bytes\n",
        html.len()
    );

    let functions = script_function_names(html);
    if !functions.is_empty() {
        readme.push_str("\n### Key Functions\n");
        for name in functions.iter().take(MAX_LISTED_FUNCTIONS) {
            let _ = writeln!(readme, "- `{name}()`");
        }
    }
    if html.contains("addEventListener") {
        readme.push_str("\n### Event Handling\n- Interactive elements with event listeners\n");
    }

    let _ = write!(
        readme,
        "\n## Setup & Usage\n\
         1. Clone this repository\n\
         2. Open `index.html` in any modern web browser\n\
         3. No build process or server required\n\n\
         The site is also deployed with GitHub Pages.\n\n\
         ## Code Structure\n\n\
         ```\n\
         .\n\
         ├── index.html   # Complete application (HTML + CSS + JS)\n\
         ├── README.md    # This file\n\
         └── LICENSE      # MIT License\n\
         ```\n\n\
         ## Round {round} Changes\n{overview}\n\n\
         ## License\n\
         This project is licensed under the MIT License - see the LICENSE file for details.\n"
    );

    readme
}
