use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::config::{
    KEY_ADD_METADATA, KEY_EMBED_THUMB, KEY_FORCE_OVERWRITE, KEY_NO_PLAYLIST, KEY_RECODE_ENABLED,
};
use crate::core::Config;
use crate::ui::{self, format_flag};

/// Keys stored as `1`/`0`
const FLAG_KEYS: &[&str] = &[
    KEY_RECODE_ENABLED,
    KEY_FORCE_OVERWRITE,
    KEY_EMBED_THUMB,
    KEY_ADD_METADATA,
    KEY_NO_PLAYLIST,
];

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", sub_matches)) => show(sub_matches.get_flag("json")),
        Some(("set", sub_matches)) => set(sub_matches),
        Some(("reset", sub_matches)) => reset(sub_matches.get_flag("yes")),
        Some(("path", _)) => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        _ => {
            println!("Use 'vfetch config --help' for more information.");
            Ok(())
        }
    }
}

fn show(json: bool) -> Result<()> {
    let config = Config::load()?;

    if json {
        let text = serde_json::to_string_pretty(&config)
            .context("Failed to serialize settings")?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", "Settings".cyan().bold());
    ui::dimmed(&format!("  {}", Config::get_config_path()?.display()));
    println!();

    for (key, value) in config.entries() {
        let shown = if FLAG_KEYS.contains(&key) {
            format_flag(&value).to_string()
        } else if value.is_empty() {
            "(unset)".dimmed().to_string()
        } else {
            value
        };
        println!("  {:<22} {}", key.white().bold(), shown);
    }

    Ok(())
}

fn set(matches: &ArgMatches) -> Result<()> {
    let key = matches.get_one::<String>("key").context("KEY is required")?;
    let value = matches
        .get_one::<String>("value")
        .map(String::as_str)
        .unwrap_or("");

    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    ui::success(&format!(
        "✓ {} = {}",
        key.to_uppercase(),
        config.get(key).unwrap_or_default()
    ));
    Ok(())
}

fn reset(skip_confirm: bool) -> Result<()> {
    if !skip_confirm && !ui::confirm("Reset all settings to their defaults?", false)? {
        ui::dimmed("Cancelled");
        return Ok(());
    }

    Config::default().save()?;
    ui::success("✓ Settings reset to defaults");
    Ok(())
}
