// UI prompts and user-facing messages

use colored::Colorize;

/// Ask user for yes/no confirmation
pub fn confirm(message: &str, default: bool) -> anyhow::Result<bool> {
    let answer = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()?;
    Ok(answer)
}

/// Display a warning message
pub fn warn(message: &str) {
    println!("{}", format!("⚠️  Warning: {}", message).yellow().bold());
}

/// Display an info message
pub fn info(message: &str) {
    println!("{}", message.cyan());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

/// Display an error message
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Display a dimmed/secondary message
pub fn dimmed(message: &str) {
    println!("{}", message.dimmed());
}

/// Section banner used at the start of long operations
pub fn banner(title: &str) {
    println!();
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".cyan());
    println!("{}", format!("  {}", title).cyan().bold());
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".cyan());
    println!();
}
