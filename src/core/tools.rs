// External tool discovery and bounded invocation (yt-dlp, ffmpeg, ffprobe)
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::Config;
use crate::error::{Result, VfetchError};

pub const YT_DLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Upper bound for short read-only queries (title lookup, codec probe)
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Resolved locations of the external executables
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Downloader; may point at a missing file, which surfaces as a launch failure
    pub yt_dlp: PathBuf,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl Toolchain {
    /// Resolve tools from configured paths first, then from `PATH`
    pub fn detect(config: &Config) -> Self {
        let yt_dlp = resolve(config.yt_dlp_path.as_deref(), YT_DLP)
            .unwrap_or_else(|| PathBuf::from(YT_DLP));
        let ffmpeg = resolve(config.ffmpeg_path.as_deref(), FFMPEG);
        let ffprobe = resolve(config.ffprobe_path.as_deref(), FFPROBE);

        log::debug!(
            "Toolchain: yt-dlp={:?} ffmpeg={:?} ffprobe={:?}",
            yt_dlp,
            ffmpeg,
            ffprobe
        );

        Self {
            yt_dlp,
            ffmpeg,
            ffprobe,
        }
    }

    /// Toolchain with an explicit downloader and no ffmpeg/ffprobe
    pub fn with_downloader(yt_dlp: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp: yt_dlp.into(),
            ffmpeg: None,
            ffprobe: None,
        }
    }

    pub fn has_ffmpeg(&self) -> bool {
        self.ffmpeg.is_some()
    }

    /// Ask yt-dlp for the title of `url`.
    ///
    /// Returns the last non-empty stdout line, or `None` on any failure.
    pub fn fetch_title(&self, url: &str) -> Option<String> {
        let args = ["--no-warnings", "--get-title", url];
        let captured = run_captured(&self.yt_dlp, &args, QUERY_TIMEOUT)
            .map_err(|e| log::debug!("Title lookup failed for {}: {}", url, e))
            .ok()?;

        captured
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(String::from)
    }
}

/// Configured path if it exists, otherwise a `PATH` lookup
fn resolve(configured: Option<&str>, name: &str) -> Option<PathBuf> {
    if let Some(path) = configured.filter(|p| !p.trim().is_empty()) {
        let path = Path::new(path);
        if path.exists() {
            return Some(path.to_path_buf());
        }
        log::warn!("Configured {} path does not exist: {}", name, path.display());
    }

    which::which(name).ok()
}

/// Output of a finished (or timed out) child process
#[derive(Debug)]
pub struct Captured {
    /// `None` when the process was killed after the deadline
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }
}

/// Run `program` with `args`, capturing stdout/stderr, killing it after `timeout`
pub fn run_captured<S: AsRef<std::ffi::OsStr>>(
    program: &Path,
    args: &[S],
    timeout: Duration,
) -> Result<Captured> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| VfetchError::launch(program.display().to_string(), e))?;

    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = wait_with_deadline(&mut child, timeout)?;
    if status.is_none() {
        log::warn!(
            "{} did not finish within {}s, killed",
            program.display(),
            timeout.as_secs()
        );
    }

    let stdout = stdout_reader.map(join_reader).unwrap_or_default();
    let stderr = stderr_reader.map(join_reader).unwrap_or_default();

    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}

/// Poll `child` until it exits or `timeout` elapses; on timeout kill and reap it
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait()? {
            Some(status) => return Ok(Some(status)),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
