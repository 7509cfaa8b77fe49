// Cancellation state shared between the download worker and the stop action
use parking_lot::Mutex;
use std::io;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Shared {
    cancelled: AtomicBool,
    child: Mutex<Option<Child>>,
}

impl Shared {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(child) = self.child.lock().as_mut() {
            if let Err(e) = child.kill() {
                log::debug!("Kill on cancel: {}", e);
            }
        }
    }
}

/// State of the single active run: the cancel flag and the running
/// downloader process. Owned by the worker; the stop action talks to it
/// through a [`StopHandle`].
#[derive(Default)]
pub struct RunContext {
    shared: Arc<Shared>,
}

/// Cloneable handle that requests cancellation of the worker's run
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Set the cancel flag and kill the running downloader, if any
    pub fn stop(&self) {
        self.shared.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Track `child` as the running process
    pub(crate) fn attach(&self, child: Child) {
        *self.shared.child.lock() = Some(child);
    }

    /// Stop tracking the process and hand it back
    pub(crate) fn detach(&self) -> Option<Child> {
        self.shared.child.lock().take()
    }

    pub(crate) fn kill(&self) {
        if let Some(child) = self.shared.child.lock().as_mut() {
            let _ = child.kill();
        }
    }

    /// Wait up to `grace` for the tracked process to exit.
    ///
    /// `Ok(None)` means it is still running (or none is attached).
    pub(crate) fn wait_exit(&self, grace: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + grace;

        loop {
            {
                let mut guard = self.shared.child.lock();
                let Some(child) = guard.as_mut() else {
                    return Ok(None);
                };
                if let Some(status) = child.try_wait()? {
                    return Ok(Some(status));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}
