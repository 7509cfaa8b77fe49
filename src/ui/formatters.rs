use chrono::{DateTime, Local};
use std::time::SystemTime;

/// Format file size in human-readable format (B, KB, MB, GB)
pub fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{}B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format timestamp as local wall-clock time (HH:MM:SS)
pub fn format_clock(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%H:%M:%S").to_string()
}

/// Yes/no rendering of a persisted flag
pub fn format_flag(value: &str) -> &'static str {
    if value == "1" {
        "yes"
    } else {
        "no"
    }
}
