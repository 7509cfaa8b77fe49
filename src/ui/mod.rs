// UI and formatting module

pub mod form;
pub mod formatters;
pub mod progress;
pub mod prompts;

// Re-export commonly used items for cleaner imports
pub use formatters::{format_clock, format_flag, format_size};
pub use progress::{clear_line, show_progress_bar};
pub use prompts::{banner, confirm, dimmed, error, info, success, warn};
