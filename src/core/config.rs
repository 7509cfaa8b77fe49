use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::request::{CookiePolicy, DownloadRequest, Mode};

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "VFETCH_CONFIG";

pub const KEY_OUTDIR: &str = "LAST_OUTDIR";
pub const KEY_FORMAT: &str = "LAST_FORMAT";
pub const KEY_AUDIO_FORMAT: &str = "LAST_AUDIO_FORMAT";
pub const KEY_AUDIO_QUALITY: &str = "LAST_AUDIO_QUALITY";
pub const KEY_RECODE_VIDEO: &str = "LAST_RECODE_VIDEO";
pub const KEY_RECODE_ENABLED: &str = "LAST_RECODE_ENABLED";
pub const KEY_USER_AGENT: &str = "LAST_USER_AGENT";
pub const KEY_FORCE_OVERWRITE: &str = "LAST_FORCE_OVERWRITE";
pub const KEY_EMBED_THUMB: &str = "LAST_EMBED_THUMB";
pub const KEY_ADD_METADATA: &str = "LAST_ADD_METADATA";
pub const KEY_NO_PLAYLIST: &str = "LAST_NO_PLAYLIST";
pub const KEY_COOKIES: &str = "LAST_COOKIES";
pub const KEY_COOKIE_FILE: &str = "LAST_COOKIE_FILE";
pub const KEY_COOKIE_BROWSER: &str = "LAST_COOKIE_BROWSER";
pub const KEY_YT_DLP_PATH: &str = "YT_DLP_PATH";
pub const KEY_FFMPEG_PATH: &str = "FFMPEG_PATH";
pub const KEY_FFPROBE_PATH: &str = "FFPROBE_PATH";

pub const ALL_KEYS: &[&str] = &[
    KEY_OUTDIR,
    KEY_FORMAT,
    KEY_AUDIO_FORMAT,
    KEY_AUDIO_QUALITY,
    KEY_RECODE_VIDEO,
    KEY_RECODE_ENABLED,
    KEY_USER_AGENT,
    KEY_FORCE_OVERWRITE,
    KEY_EMBED_THUMB,
    KEY_ADD_METADATA,
    KEY_NO_PLAYLIST,
    KEY_COOKIES,
    KEY_COOKIE_FILE,
    KEY_COOKIE_BROWSER,
    KEY_YT_DLP_PATH,
    KEY_FFMPEG_PATH,
    KEY_FFPROBE_PATH,
];

pub const DEFAULT_FORMAT: &str = "1080p";
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";
pub const DEFAULT_AUDIO_QUALITY: &str = "0";
pub const DEFAULT_RECODE_VIDEO: &str = "mp4";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

/// Last-used values of every user-facing option, persisted as `KEY=value` lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub output_dir: PathBuf,
    pub format: String,
    pub audio_format: String,
    pub audio_quality: String,
    pub recode_target: String,
    pub recode_enabled: bool,
    pub user_agent: String,
    pub force_overwrite: bool,
    pub embed_thumbnail: bool,
    pub add_metadata: bool,
    pub no_playlist: bool,
    /// `none`, `file` or `browser`
    pub cookies: String,
    pub cookie_file: String,
    pub cookie_browser: String,
    pub yt_dlp_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: DEFAULT_FORMAT.to_string(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            audio_quality: DEFAULT_AUDIO_QUALITY.to_string(),
            recode_target: DEFAULT_RECODE_VIDEO.to_string(),
            recode_enabled: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            force_overwrite: false,
            embed_thumbnail: false,
            add_metadata: false,
            no_playlist: false,
            cookies: "none".to_string(),
            cookie_file: String::new(),
            cookie_browser: String::new(),
            yt_dlp_path: None,
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Ok(Self::parse(&text))
    }

    /// Parse `KEY=value` lines. Bad lines and unknown keys are skipped.
    pub fn parse(text: &str) -> Self {
        let mut config = Config::default();

        for line in text.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            if let Err(e) = config.set(key.trim(), value) {
                log::debug!("Ignoring config line '{}': {}", line, e);
            }
        }

        config
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, self.to_text())
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("vfetch").join("config"))
    }

    /// Directory holding the settings file and generated files such as cookies
    pub fn get_data_dir() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        Ok(config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn to_text(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }

    /// All persisted entries in file order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_OUTDIR, self.output_dir.to_string_lossy().to_string()),
            (KEY_FORMAT, self.format.clone()),
            (KEY_AUDIO_FORMAT, self.audio_format.clone()),
            (KEY_AUDIO_QUALITY, self.audio_quality.clone()),
            (KEY_RECODE_VIDEO, self.recode_target.clone()),
            (KEY_RECODE_ENABLED, flag(self.recode_enabled)),
            (KEY_USER_AGENT, self.user_agent.clone()),
            (KEY_FORCE_OVERWRITE, flag(self.force_overwrite)),
            (KEY_EMBED_THUMB, flag(self.embed_thumbnail)),
            (KEY_ADD_METADATA, flag(self.add_metadata)),
            (KEY_NO_PLAYLIST, flag(self.no_playlist)),
            (KEY_COOKIES, self.cookies.clone()),
            (KEY_COOKIE_FILE, self.cookie_file.clone()),
            (KEY_COOKIE_BROWSER, self.cookie_browser.clone()),
            (KEY_YT_DLP_PATH, self.yt_dlp_path.clone().unwrap_or_default()),
            (KEY_FFMPEG_PATH, self.ffmpeg_path.clone().unwrap_or_default()),
            (KEY_FFPROBE_PATH, self.ffprobe_path.clone().unwrap_or_default()),
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Set a single key. Unknown keys and malformed booleans are errors;
    /// the previous value is kept in that case.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key.to_uppercase().as_str() {
            KEY_OUTDIR => {
                if !value.is_empty() {
                    self.output_dir = PathBuf::from(value);
                }
            }
            KEY_FORMAT => self.format = non_empty(value, DEFAULT_FORMAT),
            KEY_AUDIO_FORMAT => {
                self.audio_format = non_empty(value, DEFAULT_AUDIO_FORMAT).to_lowercase()
            }
            KEY_AUDIO_QUALITY => self.audio_quality = non_empty(value, DEFAULT_AUDIO_QUALITY),
            KEY_RECODE_VIDEO => {
                self.recode_target = non_empty(value, DEFAULT_RECODE_VIDEO).to_lowercase()
            }
            KEY_RECODE_ENABLED => self.recode_enabled = parse_flag(key, value)?,
            KEY_USER_AGENT => self.user_agent = value.to_string(),
            KEY_FORCE_OVERWRITE => self.force_overwrite = parse_flag(key, value)?,
            KEY_EMBED_THUMB => self.embed_thumbnail = parse_flag(key, value)?,
            KEY_ADD_METADATA => self.add_metadata = parse_flag(key, value)?,
            KEY_NO_PLAYLIST => self.no_playlist = parse_flag(key, value)?,
            KEY_COOKIES => match value.to_lowercase().as_str() {
                "" | "none" => self.cookies = "none".to_string(),
                "file" | "browser" => self.cookies = value.to_lowercase(),
                other => bail!("{} must be none, file or browser, got '{}'", KEY_COOKIES, other),
            },
            KEY_COOKIE_FILE => self.cookie_file = value.to_string(),
            KEY_COOKIE_BROWSER => self.cookie_browser = value.to_string(),
            KEY_YT_DLP_PATH => self.yt_dlp_path = optional(value),
            KEY_FFMPEG_PATH => self.ffmpeg_path = optional(value),
            KEY_FFPROBE_PATH => self.ffprobe_path = optional(value),
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        match self.cookies.as_str() {
            "file" => CookiePolicy::FromFile(PathBuf::from(&self.cookie_file)),
            "browser" => CookiePolicy::FromBrowser(self.cookie_browser.clone()),
            _ => CookiePolicy::None,
        }
    }

    pub fn set_cookie_policy(&mut self, policy: &CookiePolicy) {
        self.cookies = policy.kind().to_string();
        match policy {
            CookiePolicy::None => {}
            CookiePolicy::FromFile(path) => {
                self.cookie_file = path.to_string_lossy().to_string();
            }
            CookiePolicy::FromBrowser(name) => self.cookie_browser = name.clone(),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_label(&self.format)
    }

    /// Build a request for `url` from the stored settings
    pub fn to_request(&self, url: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.trim().to_string(),
            output_dir: self.output_dir.clone(),
            mode: self.mode(),
            audio_format: self.audio_format.to_lowercase(),
            audio_quality: self.audio_quality.clone(),
            recode_enabled: self.recode_enabled,
            recode_target: self.recode_target.to_lowercase(),
            embed_thumbnail: self.embed_thumbnail,
            add_metadata: self.add_metadata,
            force_overwrite: self.force_overwrite,
            user_agent: self.user_agent.clone(),
            cookie_policy: self.cookie_policy(),
            no_playlist: self.no_playlist,
        }
    }
}

/// `~/Downloads`, then `~/Téléchargements`, else the platform download dir
pub fn default_output_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        for name in ["Downloads", "Téléchargements"] {
            let candidate = home.join(name);
            if candidate.is_dir() {
                return candidate;
            }
        }
    }

    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{} expects 1 or 0, got '{}'", key, other),
    }
}

fn non_empty(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
