// Validation of user input before it reaches the downloader
// URLs and directories are checked here so a bad queue entry is skipped
// instead of producing a confusing yt-dlp failure.

use anyhow::{ensure, Context, Result};
use std::path::Path;
use url::Url;

/// Maximum URL length accepted in the queue
const MAX_URL_LENGTH: usize = 2048;

/// Validates a URL before it is queued
///
/// Uses the `url` crate for parsing. Checks:
/// - Non-empty and within the length limit
/// - Protocol is http or https
/// - A hostname is present
/// - No control characters (null bytes, line breaks)
///
/// The URL is passed to yt-dlp as a single argv entry, never through a shell.
pub fn validate_url(url_str: &str) -> Result<()> {
    let trimmed = url_str.trim();

    ensure!(!trimmed.is_empty(), "URL cannot be empty");
    ensure!(
        trimmed.len() <= MAX_URL_LENGTH,
        "URL is too long ({} characters, max {})",
        trimmed.len(),
        MAX_URL_LENGTH
    );
    ensure!(
        !trimmed.chars().any(char::is_control),
        "URL contains control characters"
    );

    let url = Url::parse(trimmed).context("Invalid URL format")?;

    let scheme = url.scheme();
    ensure!(
        scheme == "http" || scheme == "https",
        "URL must use http or https protocol, got: {}",
        scheme
    );
    ensure!(url.host_str().is_some(), "URL has no hostname");

    Ok(())
}

/// Validates an output directory
/// Checks for:
/// - Empty or whitespace-only paths
/// - Null bytes
/// - An existing path that is a file rather than a directory
pub fn validate_directory_path(path: &str) -> Result<()> {
    let trimmed = path.trim();
    ensure!(
        !trimmed.is_empty(),
        "Path cannot be empty or whitespace-only"
    );
    ensure!(
        !path.contains('\0'),
        "Path contains null byte - security risk"
    );

    let path_buf = Path::new(trimmed);
    if path_buf.exists() {
        ensure!(
            path_buf.is_dir(),
            "Path points to a file, not a directory: {}",
            trimmed
        );
    }

    Ok(())
}

/// Parses a batch file: one URL per line, blank lines and `#` comments skipped
pub fn parse_batch(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
