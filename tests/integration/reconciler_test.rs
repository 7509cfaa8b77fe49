// Integration tests for post-download reconciliation
// Files are created in a scratch dir; older files are backdated with filetime

use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use vfetch::core::probe::FixedProbe;
use vfetch::core::reconciler::{discover_candidates, safe_rename, Reconcile, Reconciler};
use vfetch::core::request::{DownloadRequest, Mode};

fn write(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![0u8; size]).unwrap();
    path
}

fn backdate(path: &Path, secs: u64) {
    let when = SystemTime::now() - Duration::from_secs(secs);
    set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
}

fn audio_request(dir: &Path, format: &str) -> DownloadRequest {
    let mut request = DownloadRequest::new("https://example.com/v", dir, Mode::Audio);
    request.audio_format = format.to_string();
    request
}

#[test]
fn test_opus_in_webm_is_relabelled() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "Song.opus", 10);

    let renamed = safe_rename(&file, "webm", &FixedProbe::codec("opus"));

    assert_eq!(renamed, dir.path().join("Song.webm"));
    assert!(renamed.exists());
    assert!(!file.exists());
}

#[test]
fn test_opus_is_never_relabelled_as_mp3() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "Song.webm", 10);

    let renamed = safe_rename(&file, "mp3", &FixedProbe::codec("opus"));

    assert_eq!(renamed, file);
    assert!(file.exists());
    assert!(!dir.path().join("Song.mp3").exists());
}

#[test]
fn test_mp4_to_m4a_without_prober() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "Talk.mp4", 10);

    let renamed = safe_rename(&file, "m4a", &FixedProbe::unknown());

    assert_eq!(renamed, dir.path().join("Talk.m4a"));
}

#[test]
fn test_m4a_to_mp3_without_prober_is_refused() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "Talk.m4a", 10);

    let renamed = safe_rename(&file, "mp3", &FixedProbe::unknown());

    assert_eq!(renamed, file);
    assert!(file.exists());
}

#[test]
fn test_probe_overrides_compat_table() {
    let dir = TempDir::new().unwrap();
    // Extension says m4a but the stream is mp3
    let file = write(dir.path(), "Odd.m4a", 10);

    let renamed = safe_rename(&file, "mp3", &FixedProbe::codec("mp3"));

    assert_eq!(renamed, dir.path().join("Odd.mp3"));
}

#[test]
fn test_discovery_excludes_files_older_than_tolerance() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();

    let recent = write(dir.path(), "Clip.webm", 10);
    let old = write(dir.path(), "Clip (old).webm", 10);
    backdate(&old, 60);
    let slightly_early = write(dir.path(), "Clip.part-ish.webm", 10);
    backdate(&slightly_early, 2);

    let found: Vec<PathBuf> = discover_candidates(dir.path(), Some("Clip"), start)
        .into_iter()
        .map(|c| c.path)
        .collect();

    assert!(found.contains(&recent));
    assert!(found.contains(&slightly_early));
    assert!(!found.contains(&old));
}

#[test]
fn test_discovery_by_title_ignores_other_files() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();
    write(dir.path(), "Other video.mp4", 100);
    let mine = write(dir.path(), "My Title.mp4", 10);

    let found = discover_candidates(dir.path(), Some("My Title"), start);

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, mine);
}

#[test]
fn test_discovery_without_title_is_newest_first() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now() - Duration::from_secs(30);
    let older = write(dir.path(), "a.mp4", 10);
    backdate(&older, 20);
    let newer = write(dir.path(), "b.mp4", 10);

    let found = discover_candidates(dir.path(), None, start);

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].path, newer);
    assert_eq!(found[1].path, older);
}

#[test]
fn test_reconcile_renames_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();
    write(dir.path(), "Track.m4a", 500);
    let thumb = write(dir.path(), "Track.webp", 50);
    let temp = write(dir.path(), "Track.temp.m4a", 20);

    let reconciler = Reconciler::new(Box::new(FixedProbe::codec("aac")));
    let report = reconciler.reconcile(Some("Track"), start, &audio_request(dir.path(), "aac"));

    assert_eq!(report.media, Some(dir.path().join("Track.m4a")));
    assert!(!thumb.exists());
    assert!(!temp.exists());
    assert_eq!(report.removed.len(), 2);
}

#[test]
fn test_reconcile_picks_largest_media() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();
    write(dir.path(), "Song.f140.m4a", 10);
    write(dir.path(), "Song.webm", 900);

    let reconciler = Reconciler::new(Box::new(FixedProbe::codec("opus")));
    let report = reconciler.reconcile(Some("Song"), start, &audio_request(dir.path(), "opus"));

    assert_eq!(report.media, Some(dir.path().join("Song.webm")));
}

#[test]
fn test_reconcile_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();
    write(dir.path(), "Tune.mp4", 100);
    write(dir.path(), "Tune.jpg", 10);

    let reconciler = Reconciler::new(Box::new(FixedProbe::unknown()));
    let request = audio_request(dir.path(), "m4a");

    let first = reconciler.reconcile(Some("Tune"), start, &request);
    let second = reconciler.reconcile(Some("Tune"), start, &request);

    assert_eq!(first.media, Some(dir.path().join("Tune.m4a")));
    assert_eq!(second.media, first.media);
    assert!(second.removed.is_empty());
}

#[test]
fn test_reconcile_video_remux_to_mkv() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();
    write(dir.path(), "Movie.webm", 100);

    let mut request = DownloadRequest::new("https://example.com/v", dir.path(), Mode::from_label("best"));
    request.recode_enabled = false;
    request.recode_target = "mkv".to_string();

    let reconciler = Reconciler::new(Box::new(FixedProbe::unknown()));
    let report = reconciler.reconcile(Some("Movie"), start, &request);

    assert_eq!(report.media, Some(dir.path().join("Movie.mkv")));
}

#[test]
fn test_reconcile_video_with_recode_leaves_file() {
    let dir = TempDir::new().unwrap();
    let start = SystemTime::now();
    let file = write(dir.path(), "Movie.mp4", 100);

    let mut request = DownloadRequest::new("https://example.com/v", dir.path(), Mode::from_label("720p"));
    request.recode_enabled = true;
    request.recode_target = "mp4".to_string();

    let reconciler = Reconciler::new(Box::new(FixedProbe::unknown()));
    let report = reconciler.reconcile(Some("Movie"), start, &request);

    assert_eq!(report.media, Some(file));
}

#[test]
fn test_reconcile_missing_dir_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone");

    let reconciler = Reconciler::new(Box::new(FixedProbe::unknown()));
    let report = reconciler.reconcile(Some("x"), SystemTime::now(), &audio_request(&missing, "mp3"));

    assert_eq!(report.media, None);
    assert!(report.removed.is_empty());
}
