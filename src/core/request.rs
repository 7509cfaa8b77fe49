//! Download request model
//!
//! A [`DownloadRequest`] is built fresh for every URL in the queue from the
//! current form state and is never mutated afterwards.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::VfetchError;

/// Height buckets offered by the format selector, best first
pub const VIDEO_QUALITIES: &[&str] = &["1080p", "720p", "480p", "360p", "240p", "best"];

/// Label used for audio-only downloads
pub const AUDIO_MODE_LABEL: &str = "Audio";

pub const AUDIO_FORMATS: &[&str] = &["mp3", "aac", "flac", "wav", "m4a", "opus", "ogg"];
pub const AUDIO_QUALITIES: &[&str] = &["0", "5", "9"];
pub const RECODE_TARGETS: &[&str] = &["mp4", "mkv", "webm", "m4v", "mov"];

pub const DEFAULT_COOKIE_BROWSER: &str = "chrome";

/// Requested video quality
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoQuality {
    Best,
    /// Cap on the video height in pixels
    MaxHeight(u32),
    /// A label that is not one of the known buckets
    Unrecognized(String),
}

/// Download mode: a video quality bucket or audio only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Video(VideoQuality),
    Audio,
}

impl Mode {
    pub fn is_audio(&self) -> bool {
        matches!(self, Mode::Audio)
    }

    /// Parse a selector label such as `720p`, `best` or `Audio`.
    ///
    /// Never fails: unknown labels become [`VideoQuality::Unrecognized`],
    /// which the command builder maps to a plain `bestaudio` selector.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case(AUDIO_MODE_LABEL) {
            return Mode::Audio;
        }
        if label.eq_ignore_ascii_case("best") {
            return Mode::Video(VideoQuality::Best);
        }
        if VIDEO_QUALITIES.contains(&label) {
            if let Ok(height) = label.trim_end_matches('p').parse::<u32>() {
                return Mode::Video(VideoQuality::MaxHeight(height));
            }
        }
        Mode::Video(VideoQuality::Unrecognized(label.to_string()))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Audio => write!(f, "{}", AUDIO_MODE_LABEL),
            Mode::Video(VideoQuality::Best) => write!(f, "best"),
            Mode::Video(VideoQuality::MaxHeight(h)) => write!(f, "{}p", h),
            Mode::Video(VideoQuality::Unrecognized(label)) => write!(f, "{}", label),
        }
    }
}

/// Where yt-dlp should take cookies from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CookiePolicy {
    #[default]
    None,
    FromFile(PathBuf),
    /// Browser name; empty means the default browser
    FromBrowser(String),
}

impl CookiePolicy {
    /// Short name used in the settings file
    pub fn kind(&self) -> &'static str {
        match self {
            CookiePolicy::None => "none",
            CookiePolicy::FromFile(_) => "file",
            CookiePolicy::FromBrowser(_) => "browser",
        }
    }
}

impl FromStr for CookiePolicy {
    type Err = VfetchError;

    /// Accepts `none`, `file:<path>` and `browser[:<name>]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, value) = match s.split_once(':') {
            Some((kind, value)) => (kind, value.trim()),
            None => (s, ""),
        };

        match kind.to_lowercase().as_str() {
            "" | "none" => Ok(CookiePolicy::None),
            "file" => Ok(CookiePolicy::FromFile(PathBuf::from(value))),
            "browser" => Ok(CookiePolicy::FromBrowser(value.to_string())),
            other => Err(VfetchError::invalid_request(format!(
                "Unknown cookie policy '{}' (expected none, file:<path> or browser[:<name>])",
                other
            ))),
        }
    }
}

/// Everything needed to build one downloader invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub mode: Mode,
    /// Lowercased audio container name (`mp3`, `aac`, ...)
    pub audio_format: String,
    pub audio_quality: String,
    pub recode_enabled: bool,
    /// Lowercased recode container name (`mp4`, `mkv`, ...)
    pub recode_target: String,
    pub embed_thumbnail: bool,
    pub add_metadata: bool,
    pub force_overwrite: bool,
    pub user_agent: String,
    pub cookie_policy: CookiePolicy,
    pub no_playlist: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            mode,
            audio_format: "mp3".to_string(),
            audio_quality: "0".to_string(),
            recode_enabled: false,
            recode_target: "mp4".to_string(),
            embed_thumbnail: false,
            add_metadata: false,
            force_overwrite: false,
            user_agent: String::new(),
            cookie_policy: CookiePolicy::None,
            no_playlist: false,
        }
    }

    /// Same settings, different URL
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

/// Final extension wanted for an audio format (`aac` lands in `m4a`, `opus` in `webm`)
pub fn desired_audio_ext(audio_format: &str) -> String {
    let fmt = audio_format.trim().trim_start_matches('.').to_lowercase();
    match fmt.as_str() {
        "aac" => "m4a".to_string(),
        "opus" => "webm".to_string(),
        _ => fmt,
    }
}
