//! Builds the yt-dlp argument list for a [`DownloadRequest`]
//!
//! The builder never fails: options that are empty or not applicable are
//! simply left out. The only inputs besides the request are whether ffmpeg
//! is available and where the generated cookie file would live.

use std::path::PathBuf;

use crate::core::cookies::cookie_args;
use crate::core::request::{desired_audio_ext, DownloadRequest, Mode, VideoQuality};
use crate::core::tools::Toolchain;

/// Audio containers yt-dlp can embed a cover image into
pub const AUDIO_EMBED_CONTAINERS: &[&str] = &["mp3", "m4a", "flac", "ogg", "opus"];

/// Recode targets that accept an embedded thumbnail
pub const VIDEO_EMBED_CONTAINERS: &[&str] = &["mp4", "mkv", "m4v", "mov"];

pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: PathBuf,
    ffmpeg_available: bool,
    default_cookie_file: Option<PathBuf>,
}

impl CommandBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg_available: false,
            default_cookie_file: None,
        }
    }

    pub fn from_toolchain(tools: &Toolchain) -> Self {
        Self::new(&tools.yt_dlp).ffmpeg_available(tools.has_ffmpeg())
    }

    pub fn ffmpeg_available(mut self, available: bool) -> Self {
        self.ffmpeg_available = available;
        self
    }

    pub fn default_cookie_file(mut self, path: Option<PathBuf>) -> Self {
        self.default_cookie_file = path;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Ordered argument list (without the program name)
    pub fn build(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = Vec::new();

        // yt-dlp picks the real extension; renaming happens after the run
        let template = request.output_dir.join(OUTPUT_TEMPLATE);
        args.push("-o".to_string());
        args.push(template.to_string_lossy().to_string());

        if request.force_overwrite {
            args.push("--force-overwrites".to_string());
        }
        if request.add_metadata {
            args.push("--add-metadata".to_string());
        }

        if request.embed_thumbnail {
            if self.can_embed_thumbnail(request) {
                args.push("--embed-thumbnail".to_string());
            } else {
                log::debug!("Thumbnail embedding unsafe for this request, writing to disk instead");
                args.push("--write-thumbnail".to_string());
                args.push("--convert-thumbnails".to_string());
                args.push("png".to_string());
            }
        }

        let user_agent = request.user_agent.trim();
        if !user_agent.is_empty() {
            args.push("--user-agent".to_string());
            args.push(user_agent.to_string());
        }

        args.extend(cookie_args(
            &request.cookie_policy,
            self.default_cookie_file.as_deref(),
        ));

        if request.no_playlist {
            args.push("--no-playlist".to_string());
        }

        match &request.mode {
            Mode::Audio => {
                args.push("-f".to_string());
                args.push("bestaudio".to_string());
                args.push("-x".to_string());
                if !request.audio_format.is_empty() {
                    args.push("--audio-format".to_string());
                    args.push(request.audio_format.clone());
                }
                if !request.audio_quality.is_empty() {
                    args.push("--audio-quality".to_string());
                    args.push(request.audio_quality.clone());
                }
            }
            Mode::Video(quality) => {
                args.push("-f".to_string());
                args.push(format_selector(quality));

                if request.recode_enabled && !request.recode_target.is_empty() {
                    args.push("--recode-video".to_string());
                    args.push(request.recode_target.clone());
                    if let Some(codec) = recode_codec_hint(&request.recode_target) {
                        args.push("--postprocessor-args".to_string());
                        args.push(format!("ffmpeg:-c:v {}", codec));
                    }
                }
            }
        }

        let url = request.url.trim();
        if !url.is_empty() {
            args.push(url.to_string());
        }

        args
    }

    /// Whether `--embed-thumbnail` is known to work for this request
    pub fn can_embed_thumbnail(&self, request: &DownloadRequest) -> bool {
        match request.mode {
            Mode::Audio => {
                let container = desired_audio_container(&request.audio_format);
                AUDIO_EMBED_CONTAINERS.contains(&container.as_str())
            }
            Mode::Video(_) => {
                request.recode_enabled
                    && VIDEO_EMBED_CONTAINERS.contains(&request.recode_target.as_str())
                    && self.ffmpeg_available
            }
        }
    }

    /// Shell-quoted command line for display or copying
    pub fn preview(&self, request: &DownloadRequest) -> String {
        let program = self.program.to_string_lossy().to_string();
        std::iter::once(program)
            .chain(self.build(request))
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `-f` selector for a video quality
pub fn format_selector(quality: &VideoQuality) -> String {
    match quality {
        VideoQuality::Best => "bestvideo+bestaudio/best".to_string(),
        VideoQuality::MaxHeight(h) => format!("bestvideo[height<={}]+bestaudio/best", h),
        VideoQuality::Unrecognized(_) => "bestaudio".to_string(),
    }
}

/// Fixed encoder hint per recode container; mkv is a pure remux
fn recode_codec_hint(target: &str) -> Option<&'static str> {
    match target {
        "mp4" => Some("libx264"),
        "webm" => Some("libvpx-vp9"),
        _ => None,
    }
}

/// Container the extracted audio ends up in. yt-dlp writes `aac` into `.m4a`
/// but keeps `opus` in `.opus`, which accepts cover art.
fn desired_audio_container(audio_format: &str) -> String {
    match audio_format {
        "opus" => "opus".to_string(),
        other => desired_audio_ext(other),
    }
}

/// POSIX single-quote an argument when it contains anything but safe characters
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r#"'"'"'"#))
    }
}
