// Core business logic module

pub mod command_builder;
pub mod config;
pub mod cookies;
pub mod probe;
pub mod progress;
pub mod reconciler;
pub mod request;
pub mod run_context;
pub mod tools;
pub mod validation;
pub mod worker;

// Re-export commonly used items
pub use command_builder::CommandBuilder;
pub use config::Config;
pub use cookies::CookieExtractor;
pub use probe::{CodecProbe, FfprobeProbe};
pub use reconciler::{Reconcile, ReconcileReport, Reconciler};
pub use request::{CookiePolicy, DownloadRequest, Mode, VideoQuality};
pub use run_context::{RunContext, StopHandle};
pub use tools::Toolchain;
pub use worker::{DownloadWorker, QueueSummary, RunOutcome, RunState, WorkerEvent};
