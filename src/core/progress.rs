// Parsing of downloader output lines
use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)%").expect("percent regex is valid"));

/// Prefix yt-dlp uses for fatal messages
const ERROR_MARKER: &str = "ERROR:";

/// First percentage found in `line`, e.g. `[download]  42.3% of 10MiB` -> 42.3
pub fn extract_percent(line: &str) -> Option<f32> {
    PERCENT_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
}

/// Best-effort failure signal; yt-dlp wording varies between versions
pub fn is_error_line(line: &str) -> bool {
    line.trim_start().starts_with(ERROR_MARKER)
}
