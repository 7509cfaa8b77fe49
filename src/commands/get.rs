use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;

use crate::commands::options;
use crate::core::cookies::COOKIE_FILE_NAME;
use crate::core::validation;
use crate::core::{
    CommandBuilder, Config, DownloadWorker, FfprobeProbe, QueueSummary, Reconciler, RunOutcome,
    RunState, Toolchain, WorkerEvent,
};
use crate::ui::{self, form::FormState};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let mut form = FormState::load()?;
    options::apply(matches, &mut form)?;

    for id in options::ignored_options(matches, &form.controls()) {
        ui::warn(&format!("--{} does not apply to format {}", id, form.config().format));
    }

    let urls = valid_urls(collect_urls(matches)?);
    if urls.is_empty() {
        form.close();
        bail!("No valid URLs to download");
    }

    let template = form.request_for("");
    fs::create_dir_all(&template.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            template.output_dir.display()
        )
    })?;

    let tools = Toolchain::detect(form.config());
    let cookie_file = Config::get_data_dir()
        .ok()
        .map(|dir| dir.join(COOKIE_FILE_NAME));
    let builder = CommandBuilder::from_toolchain(&tools).default_cookie_file(cookie_file);
    if template.embed_thumbnail && !builder.can_embed_thumbnail(&template) {
        ui::dimmed("Thumbnail cannot be embedded here; it will be saved next to the file.");
    }

    let reconciler = Reconciler::new(Box::new(FfprobeProbe::new(tools.ffprobe.clone())));
    let (tx, rx) = mpsc::channel();
    let worker = DownloadWorker::new(tools, builder, Box::new(reconciler), tx);

    ui::banner(&format!("Downloading {} URL(s)", urls.len()));
    ui::dimmed(&format!("Saving to {}", template.output_dir.display()));
    println!();

    let total = urls.len();
    let (handle, stop) = worker.spawn(urls, template.clone());
    if let Err(e) = ctrlc::set_handler(move || stop.stop()) {
        log::warn!("Ctrl-C will not stop downloads cleanly: {}", e);
    }

    let mut index = 0;
    for event in rx {
        render_event(event, &mut index, total);
    }

    let summary = handle
        .join()
        .map_err(|_| anyhow!("Download worker panicked"))?;
    form.close();

    print_summary(&summary);

    if matches.get_flag("notify") {
        notify(&summary);
    }
    if matches.get_flag("open") {
        open_folder(&template.output_dir);
    }

    if summary.failed > 0 {
        bail!("{} download(s) failed", summary.failed);
    }
    Ok(())
}

/// Positional URLs followed by the batch file entries
fn collect_urls(matches: &ArgMatches) -> Result<Vec<String>> {
    let mut urls: Vec<String> = matches
        .get_many::<String>("urls")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if let Some(batch) = matches.get_one::<String>("batch-file") {
        let text = fs::read_to_string(batch)
            .with_context(|| format!("Failed to read batch file: {}", batch))?;
        urls.extend(validation::parse_batch(&text));
    }

    Ok(urls)
}

/// Drop invalid URLs with a warning; the rest of the queue still runs
fn valid_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .filter_map(|url| match validation::validate_url(&url) {
            Ok(()) => Some(url.trim().to_string()),
            Err(e) => {
                ui::warn(&format!("Skipping '{}': {}", url.trim(), e));
                None
            }
        })
        .collect()
}

fn render_event(event: WorkerEvent, index: &mut usize, total: usize) {
    match event {
        WorkerEvent::State { url, state } => match state {
            RunState::Launching => {
                *index += 1;
                println!(
                    "{} {}",
                    format!("[{}/{}]", index, total).cyan().bold(),
                    url.white()
                );
            }
            RunState::Reconciling => {
                ui::clear_line();
                ui::dimmed("  Tidying up output folder...");
            }
            other => log::debug!("{}: {:?}", url, other),
        },
        WorkerEvent::Progress { percent, .. } => {
            ui::show_progress_bar(percent, "  Downloading");
        }
        WorkerEvent::Finished { url, outcome } => {
            ui::clear_line();
            render_outcome(&url, &outcome);
            println!();
        }
    }
}

fn render_outcome(url: &str, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed { media } => match media {
            Some(path) => {
                let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                ui::success(&format!(
                    "  ✓ {} ({})",
                    path.display(),
                    ui::format_size(size)
                ));
            }
            None => ui::success("  ✓ Done"),
        },
        RunOutcome::Failed { error, media } => {
            ui::error(&format!("  ✗ {}: {}", url, error));
            if let Some(tail) = error.tail() {
                for line in tail.lines() {
                    eprintln!("    {}", line.dimmed());
                }
            }
            if let Some(path) = media {
                ui::dimmed(&format!("  Partial output kept: {}", path.display()));
            }
        }
        RunOutcome::Cancelled { media } => {
            ui::warn("Download stopped");
            if let Some(path) = media {
                ui::dimmed(&format!("  Kept: {}", path.display()));
            }
        }
    }
}

fn print_summary(summary: &QueueSummary) {
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".cyan());
    println!(
        "{} {}   {} {}   {} {}",
        "Completed:".green().bold(),
        summary.completed,
        "Failed:".red().bold(),
        summary.failed,
        "Stopped:".yellow().bold(),
        summary.cancelled
    );
    ui::dimmed(&format!("Finished at {}", ui::format_clock(std::time::SystemTime::now())));
}

/// Best-effort desktop notification
fn notify(summary: &QueueSummary) {
    if which::which("notify-send").is_err() {
        log::debug!("notify-send not found, skipping notification");
        return;
    }

    let body = format!(
        "{} completed, {} failed, {} stopped",
        summary.completed, summary.failed, summary.cancelled
    );
    let result = Command::new("notify-send")
        .args(["vfetch", body.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        log::warn!("Notification failed: {}", e);
    }
}

/// Best-effort open of the output folder in the file manager
fn open_folder(dir: &Path) {
    let openers: Vec<(&str, Vec<&str>)> = if cfg!(target_os = "macos") {
        vec![("open", vec![])]
    } else if cfg!(windows) {
        vec![("explorer", vec![])]
    } else {
        vec![("xdg-open", vec![]), ("gio", vec!["open"])]
    };

    for (program, prefix) in &openers {
        if which::which(program).is_err() {
            continue;
        }
        let spawned = Command::new(program)
            .args(prefix)
            .arg(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(_) => return,
            Err(e) => log::warn!("Could not run {}: {}", program, e),
        }
    }

    ui::dimmed(&format!("Output folder: {}", dir.display()));
}
