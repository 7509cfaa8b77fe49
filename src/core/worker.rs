//! Sequential download worker
//!
//! One background thread takes URLs off the queue one at a time, runs
//! yt-dlp for each, streams its merged output, and reconciles the output
//! directory afterwards. Progress and lifecycle changes are published as
//! [`WorkerEvent`]s over a channel, in the order they happen.
//!
//! Per URL the run moves through
//! `Launching -> Streaming -> WaitingForExit -> Reconciling -> Done | Failed`.
//! A stop request kills the process but still goes through `Reconciling`,
//! since partial artifacts may be on disk.

use std::collections::VecDeque;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::core::command_builder::CommandBuilder;
use crate::core::progress::{extract_percent, is_error_line};
use crate::core::reconciler::Reconcile;
use crate::core::request::DownloadRequest;
use crate::core::run_context::{RunContext, StopHandle};
use crate::core::tools::Toolchain;
use crate::error::VfetchError;

/// Lines of tool output kept for failure reports
pub const TAIL_LINES: usize = 500;

/// How long to wait for the downloader to exit once its output has ended
pub const EXIT_GRACE: Duration = Duration::from_secs(2);

const LINE_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Launching,
    Streaming,
    WaitingForExit,
    Reconciling,
    Done,
    Failed,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed { media: Option<PathBuf> },
    Failed { error: VfetchError, media: Option<PathBuf> },
    Cancelled { media: Option<PathBuf> },
}

impl RunOutcome {
    pub fn media(&self) -> Option<&PathBuf> {
        match self {
            RunOutcome::Completed { media }
            | RunOutcome::Failed { media, .. }
            | RunOutcome::Cancelled { media } => media.as_ref(),
        }
    }
}

#[derive(Debug)]
pub enum WorkerEvent {
    State { url: String, state: RunState },
    Progress { url: String, percent: f32 },
    Finished { url: String, outcome: RunOutcome },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueSummary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl QueueSummary {
    fn record(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed { .. } => self.completed += 1,
            RunOutcome::Failed { .. } => self.failed += 1,
            RunOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }
}

pub struct DownloadWorker {
    tools: Toolchain,
    builder: CommandBuilder,
    reconciler: Box<dyn Reconcile>,
    events: Sender<WorkerEvent>,
    exit_grace: Duration,
}

impl DownloadWorker {
    pub fn new(
        tools: Toolchain,
        builder: CommandBuilder,
        reconciler: Box<dyn Reconcile>,
        events: Sender<WorkerEvent>,
    ) -> Self {
        Self {
            tools,
            builder,
            reconciler,
            events,
            exit_grace: EXIT_GRACE,
        }
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    /// Run the queue on a background thread
    pub fn spawn(
        self,
        urls: Vec<String>,
        template: DownloadRequest,
    ) -> (thread::JoinHandle<QueueSummary>, StopHandle) {
        let ctx = RunContext::new();
        let stop = ctx.stop_handle();
        let handle = thread::spawn(move || self.run_queue(&urls, &template, &ctx));
        (handle, stop)
    }

    /// Process `urls` strictly in order, stopping early once cancelled
    pub fn run_queue(
        &self,
        urls: &[String],
        template: &DownloadRequest,
        ctx: &RunContext,
    ) -> QueueSummary {
        let mut summary = QueueSummary::default();

        for url in urls {
            if ctx.is_cancelled() {
                log::info!("Queue stopped before {}", url);
                break;
            }
            let url = url.trim();
            if url.is_empty() {
                continue;
            }

            let request = template.with_url(url);
            let outcome = self.run_one(&request, ctx);
            summary.record(&outcome);
            self.emit(WorkerEvent::Finished {
                url: url.to_string(),
                outcome,
            });
        }

        summary
    }

    /// Download a single URL and reconcile its output
    pub fn run_one(&self, request: &DownloadRequest, ctx: &RunContext) -> RunOutcome {
        let url = request.url.as_str();
        self.set_state(url, RunState::Launching);

        let args = self.builder.build(request);
        let start_time = SystemTime::now();
        log::info!("Launching {} for {}", self.tools.yt_dlp.display(), url);

        let mut child = match Command::new(&self.tools.yt_dlp)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let error = VfetchError::launch(self.tools.yt_dlp.display().to_string(), e);
                log::error!("{}", error);
                self.set_state(url, RunState::Failed);
                return RunOutcome::Failed { error, media: None };
            }
        };

        // stdout and stderr merged into one line stream
        let (line_tx, line_rx) = mpsc::channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, line_tx.clone());
        }
        drop(line_tx);

        ctx.attach(child);
        self.set_state(url, RunState::Streaming);

        let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
        let mut saw_error = false;

        loop {
            if ctx.is_cancelled() {
                ctx.kill();
                break;
            }
            match line_rx.recv_timeout(LINE_POLL) {
                Ok(line) => {
                    log::debug!("yt-dlp: {}", line);
                    if let Some(percent) = extract_percent(&line) {
                        self.emit(WorkerEvent::Progress {
                            url: url.to_string(),
                            percent,
                        });
                    }
                    if is_error_line(&line) {
                        saw_error = true;
                    }
                    if tail.len() == TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.set_state(url, RunState::WaitingForExit);
        if ctx.is_cancelled() {
            ctx.kill();
        }
        let status = self.wait_for_exit(ctx);
        if ctx.is_cancelled() {
            ctx.kill();
        }
        if let Some(child) = ctx.detach() {
            if status.is_none() {
                reap_in_background(child);
            }
        }

        self.set_state(url, RunState::Reconciling);
        let cancelled = ctx.is_cancelled();
        let title = if cancelled {
            None
        } else {
            self.tools.fetch_title(url)
        };
        let report = self
            .reconciler
            .reconcile(title.as_deref(), start_time, request);
        let media = report.media;

        if cancelled {
            log::info!("Cancelled {}", url);
            self.set_state(url, RunState::Done);
            return RunOutcome::Cancelled { media };
        }

        let (exit_ok, code) = exit_verdict(status.as_ref());
        if exit_ok && !saw_error {
            self.set_state(url, RunState::Done);
            RunOutcome::Completed { media }
        } else {
            self.set_state(url, RunState::Failed);
            if let Some(signal) = status.as_ref().and_then(terminating_signal) {
                log::warn!("yt-dlp for {} was killed by signal {}", url, signal);
                if tail.len() == TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(format!("yt-dlp was killed by signal {}", signal));
            }
            let tail = tail.into_iter().collect::<Vec<_>>().join("\n");
            RunOutcome::Failed {
                error: VfetchError::ToolFailed { code, tail },
                media,
            }
        }
    }

    fn wait_for_exit(&self, ctx: &RunContext) -> Option<ExitStatus> {
        match ctx.wait_exit(self.exit_grace) {
            Ok(Some(status)) => Some(status),
            Ok(None) => {
                log::warn!(
                    "yt-dlp still running after {}s, continuing",
                    self.exit_grace.as_secs()
                );
                None
            }
            Err(e) => {
                log::warn!("Waiting for yt-dlp failed: {}", e);
                None
            }
        }
    }

    fn set_state(&self, url: &str, state: RunState) {
        self.emit(WorkerEvent::State {
            url: url.to_string(),
            state,
        });
    }

    fn emit(&self, event: WorkerEvent) {
        // The receiver going away only means nobody is watching
        let _ = self.events.send(event);
    }
}

/// Whether the exit counts as success, and the exit code if there is one.
///
/// A process still running after the grace period counts as success. A
/// process killed by a signal has no code and fails.
fn exit_verdict(status: Option<&ExitStatus>) -> (bool, Option<i32>) {
    match status {
        None => (true, None),
        Some(status) => match status.code() {
            Some(code) => (code == 0 || code == 1, Some(code)),
            None => (false, None),
        },
    }
}

#[cfg(unix)]
fn terminating_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn terminating_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Wait for a downloader that outlived the grace period so it does not linger unreaped
fn reap_in_background(mut child: Child) {
    let pid = child.id();
    log::warn!("yt-dlp (pid {}) still running, reaping in background", pid);
    thread::spawn(move || match child.wait() {
        Ok(status) => log::debug!("yt-dlp (pid {}) exited late: {}", pid, status),
        Err(e) => log::warn!("Could not reap yt-dlp (pid {}): {}", pid, e),
    });
}

/// Forward `stream` as lines; `\r` counts as a line break since yt-dlp
/// redraws its progress line with it
fn spawn_line_reader<R: Read + Send + 'static>(mut stream: R, tx: Sender<String>) {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut line = Vec::new();

        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            for &byte in &buf[..n] {
                if byte == b'\n' || byte == b'\r' {
                    if !line.is_empty() {
                        if tx.send(String::from_utf8_lossy(&line).into_owned()).is_err() {
                            return;
                        }
                        line.clear();
                    }
                } else {
                    line.push(byte);
                }
            }
        }

        if !line.is_empty() {
            let _ = tx.send(String::from_utf8_lossy(&line).into_owned());
        }
    });
}
