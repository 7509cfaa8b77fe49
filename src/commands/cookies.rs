use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::cookies::COOKIE_FILE_NAME;
use crate::core::request::DEFAULT_COOKIE_BROWSER;
use crate::core::{Config, CookieExtractor, Toolchain};
use crate::error::VfetchError;
use crate::ui;

/// When yt-dlp picks up the generated file instead of reading the browser again
const GENERATED_FILE_HINT: &str =
    "Used in place of the browser whenever --cookies-from-browser (or LAST_COOKIES=browser) is set.";

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("generate", sub_matches)) => generate(sub_matches),
        _ => {
            println!("Use 'vfetch cookies --help' for more information.");
            Ok(())
        }
    }
}

/// Dump browser cookies into the default cookie file
fn generate(matches: &ArgMatches) -> Result<()> {
    let config = Config::load()?;
    let browser = matches
        .get_one::<String>("browser")
        .cloned()
        .filter(|b| !b.trim().is_empty())
        .or_else(|| Some(config.cookie_browser.clone()).filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_COOKIE_BROWSER.to_string());

    let target = Config::get_data_dir()?.join(COOKIE_FILE_NAME);
    let tools = Toolchain::detect(&config);

    ui::info(&format!("Reading cookies from {}...", browser));

    match CookieExtractor::new(&tools.yt_dlp).generate(&browser, &target) {
        Ok(path) => {
            ui::success(&format!("✓ Cookies written to {}", path.display()));
            ui::dimmed(GENERATED_FILE_HINT);
            Ok(())
        }
        Err(VfetchError::SecretStorageMissing { browser, remediation }) => {
            ui::error(&format!("Could not read {} cookies.", browser));
            ui::warn(&remediation);
            Err(anyhow::anyhow!("Secret storage unavailable for {}", browser))
        }
        Err(e) => Err(e).context("Cookie generation failed"),
    }
}
