//! Post-download reconciliation
//!
//! After a downloader run this module finds the file the run produced,
//! renames it to the wanted extension when that is a pure container change,
//! and deletes thumbnails and temp artifacts left next to it.
//!
//! Nothing here re-encodes media, and nothing here returns an error: every
//! filesystem failure is logged and the original file is left in place.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::SystemTime;
//! use vfetch::core::probe::FfprobeProbe;
//! use vfetch::core::reconciler::{Reconcile, Reconciler};
//! use vfetch::core::request::{DownloadRequest, Mode};
//!
//! let start = SystemTime::now();
//! // ... run yt-dlp ...
//! let request = DownloadRequest::new("https://example.com/v", "/tmp/out", Mode::Audio);
//! let reconciler = Reconciler::new(Box::new(FfprobeProbe::new(None)));
//! let report = reconciler.reconcile(Some("My Title"), start, &request);
//! println!("final file: {:?}", report.media);
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::core::probe::CodecProbe;
use crate::core::request::{desired_audio_ext, DownloadRequest, Mode};

/// Files modified up to this long before the run started still count as produced by it
pub const MTIME_TOLERANCE: Duration = Duration::from_secs(5);

pub const THUMBNAIL_EXTENSIONS: &[&str] = &["webp", "jpg", "png"];

/// Substring yt-dlp puts in the names of in-progress intermediate files
pub const TEMP_MARKER: &str = ".temp.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Thumbnail,
    Temp,
    Media,
}

/// A file found in the output directory after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    pub kind: CandidateKind,
}

/// Candidates split by kind; at most one media file is authoritative
#[derive(Debug, Default)]
pub struct Classified {
    pub media: Option<PathBuf>,
    pub thumbnails: Vec<PathBuf>,
    pub temps: Vec<PathBuf>,
}

/// What reconciliation ended up doing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Final location of the media file, after any rename
    pub media: Option<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Post-run step invoked once per URL by the download worker
pub trait Reconcile: Send {
    fn reconcile(
        &self,
        title: Option<&str>,
        start_time: SystemTime,
        request: &DownloadRequest,
    ) -> ReconcileReport;
}

pub struct Reconciler {
    probe: Box<dyn CodecProbe>,
}

impl Reconciler {
    pub fn new(probe: Box<dyn CodecProbe>) -> Self {
        Self { probe }
    }
}

impl Reconcile for Reconciler {
    fn reconcile(
        &self,
        title: Option<&str>,
        start_time: SystemTime,
        request: &DownloadRequest,
    ) -> ReconcileReport {
        let output_dir = &request.output_dir;
        let candidates = discover_candidates(output_dir, title, start_time);
        log::debug!(
            "Reconciling {} candidate(s) in {}",
            candidates.len(),
            output_dir.display()
        );

        let classified = classify(candidates);
        let mut media = classified.media;

        if let Some(path) = media.take() {
            let renamed = match &request.mode {
                Mode::Audio => {
                    let desired = desired_audio_ext(&request.audio_format);
                    safe_rename(&path, &desired, self.probe.as_ref())
                }
                Mode::Video(_) if !request.recode_enabled && request.recode_target == "mkv" => {
                    remux_rename_to_mkv(&path)
                }
                Mode::Video(_) => path,
            };
            media = Some(renamed);
        }

        let mut removed = Vec::new();
        for leftover in classified.thumbnails.iter().chain(classified.temps.iter()) {
            match fs::remove_file(leftover) {
                Ok(()) => removed.push(leftover.clone()),
                Err(e) => log::warn!("Could not remove {}: {}", leftover.display(), e),
            }
        }

        ReconcileReport { media, removed }
    }
}

/// Kind of a file, judged by its name only
pub fn classify_name(name: &str) -> CandidateKind {
    let lower = name.to_lowercase();
    let is_thumbnail = THUMBNAIL_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)));

    if is_thumbnail {
        CandidateKind::Thumbnail
    } else if lower.contains(TEMP_MARKER) {
        CandidateKind::Temp
    } else {
        CandidateKind::Media
    }
}

/// Files in `dir` that the run started at `start_time` may have produced.
///
/// With a title, only names starting with it are considered. Without one,
/// every recent file is returned, most recently modified first.
pub fn discover_candidates(
    dir: &Path,
    title: Option<&str>,
    start_time: SystemTime,
) -> Vec<MediaCandidate> {
    let threshold = start_time
        .checked_sub(MTIME_TOLERANCE)
        .unwrap_or(UNIX_EPOCH);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let mut candidates = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(prefix) = title {
            if !name.starts_with(prefix) {
                continue;
            }
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified < threshold {
            continue;
        }

        candidates.push(MediaCandidate {
            path: entry.path(),
            size: metadata.len(),
            modified,
            kind: classify_name(&name),
        });
    }

    if title.is_none() {
        candidates.sort_by(|a, b| b.modified.cmp(&a.modified));
    }

    candidates
}

/// Split candidates; the largest media candidate wins, earlier ones win ties
pub fn classify(candidates: Vec<MediaCandidate>) -> Classified {
    let mut classified = Classified::default();
    let mut best: Option<MediaCandidate> = None;

    for candidate in candidates {
        match candidate.kind {
            CandidateKind::Thumbnail => classified.thumbnails.push(candidate.path),
            CandidateKind::Temp => classified.temps.push(candidate.path),
            CandidateKind::Media => {
                let larger = best.as_ref().map_or(true, |b| candidate.size > b.size);
                if larger {
                    best = Some(candidate);
                }
            }
        }
    }

    classified.media = best.map(|b| b.path);
    classified
}

/// The only container extension that is correct for an audio codec
pub fn codec_extension(codec: &str) -> Option<&'static str> {
    match codec.to_lowercase().as_str() {
        "mp3" => Some("mp3"),
        "aac" | "alac" | "mp4a" => Some("m4a"),
        "opus" | "vorbis" => Some("webm"),
        _ => None,
    }
}

/// Extensions a file may carry and still be relabelled as `desired` without probing
fn compatible_extensions(desired: &str) -> &'static [&'static str] {
    match desired {
        "m4a" => &["m4a", "mp4"],
        "mp3" => &["mp3"],
        "webm" => &["webm", "opus", "vorbis"],
        _ => &[],
    }
}

/// Rename `path` to `desired_ext` only when no re-encode would be needed.
///
/// Returns the new path on success, otherwise the original path.
pub fn safe_rename(path: &Path, desired_ext: &str, probe: &dyn CodecProbe) -> PathBuf {
    let desired = desired_ext.trim().trim_start_matches('.').to_lowercase();
    if desired.is_empty() {
        return path.to_path_buf();
    }

    let current = extension_of(path);
    if current == desired {
        return path.to_path_buf();
    }

    let allowed = match probe.audio_codec(path) {
        Some(codec) => match codec_extension(&codec) {
            Some(ext) => {
                if ext != desired {
                    log::info!(
                        "Keeping {}: codec {} does not belong in .{}",
                        path.display(),
                        codec,
                        desired
                    );
                }
                ext == desired
            }
            None => compatible_extensions(&desired).contains(&current.as_str()),
        },
        None => compatible_extensions(&desired).contains(&current.as_str()),
    };

    if !allowed {
        return path.to_path_buf();
    }

    let target = path.with_extension(&desired);
    match replace_file(path, &target) {
        Ok(()) => target,
        Err(e) => {
            log::warn!(
                "Rename {} -> {} failed: {}",
                path.display(),
                target.display(),
                e
            );
            path.to_path_buf()
        }
    }
}

/// Matroska takes any codec, so relabelling to `.mkv` is always a container-only change
fn remux_rename_to_mkv(path: &Path) -> PathBuf {
    if extension_of(path) == "mkv" {
        return path.to_path_buf();
    }

    let target = path.with_extension("mkv");
    match replace_file(path, &target) {
        Ok(()) => target,
        Err(e) => {
            log::warn!("Rename {} to mkv failed: {}", path.display(), e);
            path.to_path_buf()
        }
    }
}

/// Move `from` onto `to`, dropping any stale file already at `to`
fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    fs::rename(from, to)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
