//! Option form state shared by `get` and `preview`
//!
//! Every change goes through [`FormState`], which keeps the persisted
//! settings current and hands them to a background saver. The saver waits
//! for a quiet period before writing, so a burst of option changes costs
//! one write.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::request::{CookiePolicy, DownloadRequest};
use crate::core::Config;

/// Quiet period before pending settings are written
pub const SAVE_DELAY: Duration = Duration::from_millis(600);

enum SaverMsg {
    Save(Config),
    Flush(Sender<()>),
}

/// Background writer for the settings file
pub struct DebouncedSaver {
    tx: Option<Sender<SaverMsg>>,
    handle: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl DebouncedSaver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_delay(path, SAVE_DELAY)
    }

    pub fn with_delay(path: impl Into<PathBuf>, delay: Duration) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel::<SaverMsg>();
        let target = path.clone();

        let handle = thread::spawn(move || {
            let mut pending: Option<Config> = None;
            let mut deadline = Instant::now();

            loop {
                let msg = if pending.is_some() {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(wait) {
                        Ok(msg) => Some(msg),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                } else {
                    match rx.recv() {
                        Ok(msg) => Some(msg),
                        Err(_) => break,
                    }
                };

                match msg {
                    Some(SaverMsg::Save(config)) => {
                        pending = Some(config);
                        deadline = Instant::now() + delay;
                    }
                    Some(SaverMsg::Flush(ack)) => {
                        write_pending(&target, &mut pending);
                        ack.send(()).ok();
                    }
                    None => write_pending(&target, &mut pending),
                }
            }

            write_pending(&target, &mut pending);
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schedule `config` to be written once changes settle
    pub fn schedule(&self, config: Config) {
        if let Some(tx) = &self.tx {
            if tx.send(SaverMsg::Save(config)).is_err() {
                log::warn!("Settings saver is gone; change not persisted");
            }
        }
    }

    /// Write anything pending now and wait for it
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(SaverMsg::Flush(ack_tx)).is_ok() {
            ack_rx.recv().ok();
        }
    }

    /// Stop the saver thread after writing pending settings
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Settings saver thread panicked");
            }
        }
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_pending(path: &Path, pending: &mut Option<Config>) {
    if let Some(config) = pending.take() {
        match config.save_to(path) {
            Ok(()) => log::debug!("Settings saved to {:?}", path),
            Err(e) => log::warn!("Could not save settings: {:#}", e),
        }
    }
}

/// Which option controls currently apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStates {
    pub audio_format: bool,
    pub audio_quality: bool,
    pub recode_toggle: bool,
    pub recode_target: bool,
}

impl ControlStates {
    pub fn for_config(config: &Config) -> Self {
        let audio = config.mode().is_audio();
        Self {
            audio_format: audio,
            audio_quality: audio,
            recode_toggle: !audio,
            recode_target: !audio && config.recode_enabled,
        }
    }
}

pub struct FormState {
    config: Config,
    saver: DebouncedSaver,
}

impl FormState {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = Config::get_config_path()?;
        let config = Config::load_from(&path)?;
        Ok(Self::new(config, DebouncedSaver::new(path)))
    }

    pub fn new(config: Config, saver: DebouncedSaver) -> Self {
        Self { config, saver }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set one persisted key and schedule a save
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.config.set(key, value)?;
        self.saver.schedule(self.config.clone());
        Ok(())
    }

    /// Apply several changes at once; saved only if something changed
    pub fn update<F>(&mut self, change: F)
    where
        F: FnOnce(&mut Config),
    {
        let before = self.config.clone();
        change(&mut self.config);
        if self.config != before {
            self.saver.schedule(self.config.clone());
        }
    }

    pub fn set_cookie_policy(&mut self, policy: &CookiePolicy) {
        self.update(|config| config.set_cookie_policy(policy));
    }

    pub fn controls(&self) -> ControlStates {
        ControlStates::for_config(&self.config)
    }

    pub fn request_for(&self, url: &str) -> DownloadRequest {
        self.config.to_request(url)
    }

    pub fn flush(&self) {
        self.saver.flush();
    }

    pub fn close(mut self) {
        self.saver.close();
    }
}
