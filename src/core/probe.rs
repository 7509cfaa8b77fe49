// Audio codec detection through ffprobe
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::core::tools::{run_captured, QUERY_TIMEOUT};

/// Reports the codec of the first audio stream of a file.
///
/// `None` means "unknown": no prober, unreadable file, or no audio stream.
pub trait CodecProbe: Send + Sync {
    fn audio_codec(&self, path: &Path) -> Option<String>;
}

/// ffprobe-backed probe; without an executable every answer is unknown
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe {
    ffprobe: Option<PathBuf>,
}

impl FfprobeProbe {
    pub fn new(ffprobe: Option<PathBuf>) -> Self {
        Self { ffprobe }
    }
}

impl CodecProbe for FfprobeProbe {
    fn audio_codec(&self, path: &Path) -> Option<String> {
        let ffprobe = self.ffprobe.as_ref()?;
        if !path.exists() {
            return None;
        }

        let path_arg = path.as_os_str();
        let args = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-select_streams"),
            OsStr::new("a:0"),
            OsStr::new("-show_entries"),
            OsStr::new("stream=codec_name"),
            OsStr::new("-of"),
            OsStr::new("default=noprint_wrappers=1:nokey=1"),
            path_arg,
        ];

        let captured = match run_captured(ffprobe, &args, QUERY_TIMEOUT) {
            Ok(captured) => captured,
            Err(e) => {
                log::debug!("ffprobe failed on {}: {}", path.display(), e);
                return None;
            }
        };

        let codec = captured
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_lowercase);

        log::debug!("ffprobe {} -> {:?}", path.display(), codec);
        codec
    }
}

/// Probe that always answers the same codec
#[doc(hidden)]
#[derive(Debug, Clone, Default)]
pub struct FixedProbe(pub Option<String>);

impl FixedProbe {
    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn codec(name: &str) -> Self {
        Self(Some(name.to_string()))
    }
}

impl CodecProbe for FixedProbe {
    fn audio_codec(&self, _path: &Path) -> Option<String> {
        self.0.clone()
    }
}
