//! Cookie handling for the downloader
//!
//! Resolves a [`CookiePolicy`] into a single yt-dlp cookie directive and
//! generates the default cookie file by asking yt-dlp to extract browser
//! cookies.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::request::{CookiePolicy, DEFAULT_COOKIE_BROWSER};
use crate::core::tools::run_captured;
use crate::error::{Result, VfetchError};

pub const COOKIE_FILE_NAME: &str = "cookies.txt";

/// Browser tried when the first extraction lacks secret-storage access
pub const FALLBACK_BROWSER: &str = "firefox";

/// Page fetched while extracting; nothing is downloaded
const COOKIE_PROBE_URL: &str = "https://www.youtube.com/";

const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);

const SECRET_STORAGE_REMEDIATION: &str = "Install the secretstorage Python module \
(package python3-secretstorage) and a running keyring service such as gnome-keyring \
or kwallet, or use a browser that stores cookies without a keyring (firefox).";

/// Resolve the cookie directive for a request.
///
/// Precedence: explicit file, then the generated default file when it exists,
/// then browser extraction. At most one directive is returned.
pub fn cookie_args(policy: &CookiePolicy, default_cookie_file: Option<&Path>) -> Vec<String> {
    if let CookiePolicy::None = policy {
        return Vec::new();
    }

    if let CookiePolicy::FromFile(path) = policy {
        if !path.as_os_str().is_empty() {
            return vec![
                "--cookies".to_string(),
                path.to_string_lossy().to_string(),
            ];
        }
    }

    if let Some(generated) = default_cookie_file.filter(|p| p.is_file()) {
        return vec![
            "--cookies".to_string(),
            generated.to_string_lossy().to_string(),
        ];
    }

    let browser = match policy {
        CookiePolicy::FromBrowser(name) if !name.trim().is_empty() => name.trim(),
        _ => DEFAULT_COOKIE_BROWSER,
    };
    vec!["--cookies-from-browser".to_string(), browser.to_string()]
}

/// Runs yt-dlp to dump browser cookies into a Netscape cookie file
pub struct CookieExtractor {
    yt_dlp: PathBuf,
    timeout: Duration,
}

impl CookieExtractor {
    pub fn new(yt_dlp: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp: yt_dlp.into(),
            timeout: EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract cookies from `browser` into `target`.
    ///
    /// When the browser's cookies are locked behind a missing secret storage
    /// the extraction is retried once with [`FALLBACK_BROWSER`].
    pub fn generate(&self, browser: &str, target: &Path) -> Result<PathBuf> {
        let browser = if browser.trim().is_empty() {
            DEFAULT_COOKIE_BROWSER
        } else {
            browser.trim()
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match self.extract_once(browser, target) {
            Err(VfetchError::SecretStorageMissing { .. }) if browser != FALLBACK_BROWSER => {
                log::warn!(
                    "Secret storage unavailable for {}, retrying with {}",
                    browser,
                    FALLBACK_BROWSER
                );
                self.extract_once(FALLBACK_BROWSER, target)
                    .map_err(|e| match e {
                        VfetchError::SecretStorageMissing { .. } => {
                            VfetchError::SecretStorageMissing {
                                browser: browser.to_string(),
                                remediation: SECRET_STORAGE_REMEDIATION.to_string(),
                            }
                        }
                        other => other,
                    })
            }
            other => other,
        }
    }

    fn extract_once(&self, browser: &str, target: &Path) -> Result<PathBuf> {
        let target_str = target.to_string_lossy().to_string();
        let args = [
            "--cookies-from-browser",
            browser,
            "--cookies",
            target_str.as_str(),
            "--skip-download",
            "--no-warnings",
            "--playlist-items",
            "0",
            COOKIE_PROBE_URL,
        ];

        log::info!("Extracting cookies from {} into {}", browser, target.display());
        let captured = run_captured(&self.yt_dlp, &args, self.timeout)?;
        let output = format!("{}\n{}", captured.stdout, captured.stderr);

        if is_secret_storage_failure(&output) {
            return Err(VfetchError::SecretStorageMissing {
                browser: browser.to_string(),
                remediation: SECRET_STORAGE_REMEDIATION.to_string(),
            });
        }

        if target.is_file() {
            return Ok(target.to_path_buf());
        }

        let detail = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or("no output")
            .to_string();
        Err(VfetchError::cookie_extraction(format!(
            "{} produced no cookie file ({})",
            browser, detail
        )))
    }
}

/// Failure signature printed when the keyring backend cannot be reached
fn is_secret_storage_failure(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("secretstorage") || lower.contains("secret storage")
}
