use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::commands::options;
use crate::core::cookies::COOKIE_FILE_NAME;
use crate::core::validation;
use crate::core::{CommandBuilder, Config, Toolchain};
use crate::ui::{self, form::FormState};

/// Print the command line `get` would run for a URL
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let url = matches
        .get_one::<String>("url")
        .context("URL is required")?;
    validation::validate_url(url).with_context(|| format!("Invalid URL: {}", url))?;

    let mut form = FormState::load()?;
    options::apply(matches, &mut form)?;

    let controls = form.controls();
    for id in options::ignored_options(matches, &controls) {
        ui::warn(&format!("--{} does not apply to format {}", id, form.config().format));
    }

    let request = form.request_for(url);
    let tools = Toolchain::detect(form.config());
    let cookie_file = Config::get_data_dir()
        .ok()
        .map(|dir| dir.join(COOKIE_FILE_NAME));
    let builder = CommandBuilder::from_toolchain(&tools).default_cookie_file(cookie_file);

    println!("{}", builder.preview(&request));

    if request.embed_thumbnail && !builder.can_embed_thumbnail(&request) {
        eprintln!(
            "{}",
            "Note: thumbnail will be written as a separate PNG file".dimmed()
        );
    }

    form.close();
    Ok(())
}
