//! Repository housekeeping files.

use std::io::ErrorKind;
use std::path::Path;

use chrono::Datelike;
use tracing::debug;

pub const LICENSE_FILE: &str = "LICENSE";

/// The MIT license text for `holder` in `year`.
pub fn mit_license(year: i32, holder: &str) -> String {
    format!(
        "MIT License

Copyright (c) {year} {holder}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"
    )
}

/// Minimal README used when the folder has none.
pub fn default_readme(repo: &str, brief: &str) -> String {
    let description = if brief.is_empty() {
        "Generated static site."
    } else {
        brief
    };
    format!("# {repo}\n\n{description}\n\n## License\nMIT\n")
}

/// Writes `contents` to `path` unless the file already exists. Returns true if written.
async fn write_if_missing(path: &Path, contents: &str) -> std::io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tokio::fs::write(path, contents).await?;
            debug!(path = %path.display(), "Created missing file");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Makes sure `LICENSE` and `README.md` exist in `folder`.
pub async fn ensure_repo_files(
    folder: &Path,
    holder: &str,
    repo: &str,
    brief: &str,
) -> std::io::Result<()> {
    let year = chrono::Utc::now().year();
    write_if_missing(&folder.join(LICENSE_FILE), &mit_license(year, holder)).await?;
    write_if_missing(
        &folder.join(crate::generate::README_FILE),
        &default_readme(repo, brief),
    )
    .await?;
    Ok(())
}
