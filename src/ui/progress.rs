// Progress bar for downloader output

use colored::Colorize;
use std::io::{self, Write};

const BAR_LENGTH: usize = 30;

/// Render the `[=====     ]` part for a percentage
pub fn render_bar(percent: f32) -> (String, String) {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_LENGTH as f32) as usize;
    let empty = BAR_LENGTH.saturating_sub(filled);
    ("=".repeat(filled), " ".repeat(empty))
}

/// Redraw the progress line in place
///
/// # Arguments
/// * `percent` - Download progress, 0 to 100
/// * `prefix` - Text to display before the progress bar
pub fn show_progress_bar(percent: f32, prefix: &str) {
    let (filled, empty) = render_bar(percent);

    print!(
        "\r{} [{}{}] {:>3.0}% ",
        prefix.white(),
        filled.green(),
        empty,
        percent.clamp(0.0, 100.0)
    );

    io::stdout().flush().ok();
}

/// Clear the current line (useful for progress bars)
pub fn clear_line() {
    print!("\r{}\r", " ".repeat(80));
    io::stdout().flush().ok();
}
