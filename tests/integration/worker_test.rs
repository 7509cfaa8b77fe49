// Integration tests for the download worker
// A small sh script stands in for yt-dlp; it answers --get-title and
// otherwise writes whatever the scenario needs.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use vfetch::core::probe::FixedProbe;
use vfetch::core::reconciler::{Reconcile, ReconcileReport};
use vfetch::core::{
    CommandBuilder, DownloadRequest, DownloadWorker, Mode, Reconciler, RunContext, RunOutcome,
    RunState, Toolchain, WorkerEvent,
};
use vfetch::VfetchError;

const TITLE: &str = "Fake Clip";

/// Write an executable fake downloader; `body` runs for download calls
fn fake_downloader(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-yt-dlp");
    let script = format!(
        "#!/bin/sh\n\
         if [ \"$2\" = \"--get-title\" ]; then echo '{}'; exit 0; fi\n\
         {}\n",
        TITLE, body
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn worker_for(
    script: &Path,
    reconciler: Box<dyn Reconcile>,
) -> (DownloadWorker, mpsc::Receiver<WorkerEvent>) {
    let tools = Toolchain::with_downloader(script);
    let builder = CommandBuilder::from_toolchain(&tools);
    let (tx, rx) = mpsc::channel();
    let worker = DownloadWorker::new(tools, builder, reconciler, tx)
        .with_exit_grace(Duration::from_secs(5));
    (worker, rx)
}

struct CountingReconciler(Arc<AtomicUsize>);

impl Reconcile for CountingReconciler {
    fn reconcile(
        &self,
        _title: Option<&str>,
        _start_time: SystemTime,
        _request: &DownloadRequest,
    ) -> ReconcileReport {
        self.0.fetch_add(1, Ordering::SeqCst);
        ReconcileReport::default()
    }
}

#[test]
fn test_successful_run_reports_progress_and_media() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();

    let body = format!(
        "echo '[download]  42.5% of 1.00MiB at 1.00MiB/s'\n\
         printf 'media' > '{out}/{title}.webm'\n\
         printf 'img' > '{out}/{title}.webp'\n\
         echo '[download] 100% of 1.00MiB'\n\
         exit 0",
        out = out.display(),
        title = TITLE
    );
    let script = fake_downloader(temp.path(), &body);
    let reconciler = Reconciler::new(Box::new(FixedProbe::codec("opus")));
    let (worker, rx) = worker_for(&script, Box::new(reconciler));

    let mut request = DownloadRequest::new("", &out, Mode::Audio);
    request.audio_format = "opus".to_string();
    let summary = worker.run_queue(
        &["https://example.com/watch?v=1".to_string()],
        &request,
        &RunContext::new(),
    );
    assert_eq!(summary.completed, 1);

    let events: Vec<WorkerEvent> = rx.try_iter().collect();
    let percents: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![42.5, 100.0]);

    let states: Vec<RunState> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::State { state, .. } => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            RunState::Launching,
            RunState::Streaming,
            RunState::WaitingForExit,
            RunState::Reconciling,
            RunState::Done
        ]
    );

    let media = events.iter().find_map(|e| match e {
        WorkerEvent::Finished {
            outcome: RunOutcome::Completed { media },
            ..
        } => media.clone(),
        _ => None,
    });
    assert_eq!(media, Some(out.join(format!("{}.webm", TITLE))));
    assert!(!out.join(format!("{}.webp", TITLE)).exists());
}

#[test]
fn test_error_line_fails_run_with_tail() {
    let temp = TempDir::new().unwrap();
    let script = fake_downloader(
        temp.path(),
        "echo '[generic] Extracting URL'\necho 'ERROR: Unsupported URL' >&2\nexit 1",
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));

    let request = DownloadRequest::new("", temp.path(), Mode::from_label("720p"));
    let summary = worker.run_queue(
        &["https://example.com/nope".to_string()],
        &request,
        &RunContext::new(),
    );

    assert_eq!(summary.failed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "failed runs are still reconciled");

    let failure = rx.try_iter().find_map(|e| match e {
        WorkerEvent::Finished {
            outcome: RunOutcome::Failed { error, .. },
            ..
        } => Some(error),
        _ => None,
    });
    match failure {
        Some(VfetchError::ToolFailed { code, tail }) => {
            assert_eq!(code, Some(1));
            assert!(tail.contains("ERROR: Unsupported URL"));
            assert!(tail.contains("[generic] Extracting URL"));
        }
        other => panic!("expected ToolFailed, got {:?}", other),
    }
}

#[test]
fn test_nonzero_exit_without_error_line_fails() {
    let temp = TempDir::new().unwrap();
    let script = fake_downloader(temp.path(), "echo 'something odd'\nexit 3");
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, _rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));

    let request = DownloadRequest::new("", temp.path(), Mode::Audio);
    let summary = worker.run_queue(&["https://example.com/a".to_string()], &request, &RunContext::new());

    assert_eq!(summary.failed, 1);
}

#[test]
fn test_signal_kill_fails_run() {
    let temp = TempDir::new().unwrap();
    let script = fake_downloader(temp.path(), "echo '[download]  12.0%'\nkill -9 $$");
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));

    let request = DownloadRequest::new("", temp.path(), Mode::from_label("720p"));
    let summary = worker.run_queue(&["https://example.com/k".to_string()], &request, &RunContext::new());

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let failure = rx.try_iter().find_map(|e| match e {
        WorkerEvent::Finished {
            outcome: RunOutcome::Failed { error, .. },
            ..
        } => Some(error),
        _ => None,
    });
    match failure {
        Some(VfetchError::ToolFailed { code, tail }) => {
            assert_eq!(code, None);
            assert!(tail.contains("[download]  12.0%"));
            assert!(tail.contains("killed by signal 9"));
        }
        other => panic!("expected ToolFailed, got {:?}", other),
    }
}

#[test]
fn test_process_outliving_grace_still_completes() {
    let temp = TempDir::new().unwrap();
    // Closes its output right away but keeps running past the grace period
    let script = fake_downloader(temp.path(), "exec >/dev/null 2>&1\nsleep 1\nexit 0");
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, _rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));
    let worker = worker.with_exit_grace(Duration::from_millis(100));

    let request = DownloadRequest::new("", temp.path(), Mode::Audio);
    let summary = worker.run_queue(&["https://example.com/slow".to_string()], &request, &RunContext::new());

    assert_eq!(summary.completed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_cancels_run_and_rest_of_queue() {
    let temp = TempDir::new().unwrap();
    let script = fake_downloader(
        temp.path(),
        "echo '[download]   3.0% of 9.00MiB'\nexec sleep 30",
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));

    let request = DownloadRequest::new("", temp.path(), Mode::from_label("480p"));
    let urls = vec![
        "https://example.com/first".to_string(),
        "https://example.com/second".to_string(),
    ];
    let (handle, stop) = worker.spawn(urls, request);

    let mut launches = 0;
    let mut cancelled = 0;
    for event in rx {
        match event {
            WorkerEvent::State {
                state: RunState::Launching,
                ..
            } => launches += 1,
            WorkerEvent::Progress { .. } => stop.stop(),
            WorkerEvent::Finished {
                outcome: RunOutcome::Cancelled { .. },
                ..
            } => cancelled += 1,
            _ => {}
        }
    }

    let summary = handle.join().unwrap();
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.completed + summary.failed, 0);
    assert_eq!(cancelled, 1);
    assert_eq!(launches, 1, "second URL must not start");
    assert_eq!(calls.load(Ordering::SeqCst), 1, "cancelled run is reconciled once");
    assert!(stop.is_stopped());
}

#[test]
fn test_video_request_reaches_downloader_verbatim() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    let args_file = temp.path().join("args.txt");

    let body = format!("printf '%s\\n' \"$@\" > '{}'\nexit 0", args_file.display());
    let script = fake_downloader(temp.path(), &body);
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, _rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));

    let mut request = DownloadRequest::new("", &out, Mode::from_label("720p"));
    request.recode_enabled = false;
    request.no_playlist = true;
    let url = "https://example.com/watch?v=abc&list=xyz";
    worker.run_queue(&[url.to_string()], &request, &RunContext::new());

    let args: Vec<String> = fs::read_to_string(&args_file)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();

    let f = args.iter().position(|a| a == "-f").unwrap();
    assert_eq!(args[f + 1], "bestvideo[height<=720]+bestaudio/best");
    assert!(!args.iter().any(|a| a == "--recode-video"));
    assert!(args.iter().any(|a| a == "--no-playlist"));
    assert_eq!(args.last().map(String::as_str), Some(url));
}

#[test]
fn test_output_split_on_carriage_returns() {
    let temp = TempDir::new().unwrap();
    let script = fake_downloader(
        temp.path(),
        "printf '[download]  10.0%%\\r[download]  20.0%%\\r[download]  30.0%%\\n'\nexit 0",
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let (worker, rx) = worker_for(&script, Box::new(CountingReconciler(Arc::clone(&calls))));

    let request = DownloadRequest::new("", temp.path(), Mode::Audio);
    worker.run_queue(&["https://example.com/a".to_string()], &request, &RunContext::new());

    let percents: Vec<f32> = rx
        .try_iter()
        .filter_map(|e| match e {
            WorkerEvent::Progress { percent, .. } => Some(percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![10.0, 20.0, 30.0]);
}
