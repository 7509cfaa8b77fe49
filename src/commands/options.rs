// Request options shared by `get` and `preview`

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

use crate::core::config::{
    KEY_ADD_METADATA, KEY_AUDIO_FORMAT, KEY_AUDIO_QUALITY, KEY_EMBED_THUMB, KEY_FORCE_OVERWRITE,
    KEY_FORMAT, KEY_NO_PLAYLIST, KEY_RECODE_ENABLED, KEY_RECODE_VIDEO, KEY_USER_AGENT,
};
use crate::core::request::{
    CookiePolicy, AUDIO_FORMATS, AUDIO_MODE_LABEL, AUDIO_QUALITIES, DEFAULT_COOKIE_BROWSER,
    RECODE_TARGETS, VIDEO_QUALITIES,
};
use crate::core::validation;
use crate::ui::form::{ControlStates, FormState};

/// Boolean options given as `--name` / `--no-name` pairs, with their settings key
const FLAG_PAIRS: &[(&str, &str, &str)] = &[
    ("recode", "no-recode", KEY_RECODE_ENABLED),
    ("embed-thumbnail", "no-embed-thumbnail", KEY_EMBED_THUMB),
    ("add-metadata", "no-add-metadata", KEY_ADD_METADATA),
    ("force-overwrite", "no-force-overwrite", KEY_FORCE_OVERWRITE),
    ("no-playlist", "playlist", KEY_NO_PLAYLIST),
];

/// Add the request options to a subcommand
pub fn with_request_args(cmd: Command) -> Command {
    let formats: Vec<&'static str> = VIDEO_QUALITIES
        .iter()
        .copied()
        .chain(std::iter::once(AUDIO_MODE_LABEL))
        .collect();

    let cmd = cmd
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory to save downloads in"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(PossibleValuesParser::new(formats))
                .help("Video quality, or Audio to extract audio only"),
        )
        .arg(
            Arg::new("audio-format")
                .long("audio-format")
                .value_name("FMT")
                .value_parser(PossibleValuesParser::new(AUDIO_FORMATS.iter().copied()))
                .help("Audio container for Audio mode"),
        )
        .arg(
            Arg::new("audio-quality")
                .long("audio-quality")
                .value_name("Q")
                .value_parser(PossibleValuesParser::new(AUDIO_QUALITIES.iter().copied()))
                .help("Audio quality for Audio mode (0 = best)"),
        )
        .arg(
            Arg::new("recode-target")
                .long("recode-target")
                .value_name("CONTAINER")
                .value_parser(PossibleValuesParser::new(RECODE_TARGETS.iter().copied()))
                .help("Container to recode video into"),
        )
        .arg(
            Arg::new("user-agent")
                .long("user-agent")
                .value_name("UA")
                .help("User agent sent by the downloader (empty to omit)"),
        )
        .arg(
            Arg::new("cookies")
                .long("cookies")
                .value_name("FILE")
                .conflicts_with_all(["cookies-from-browser", "no-cookies"])
                .help("Use cookies from a Netscape cookie file"),
        )
        .arg(
            Arg::new("cookies-from-browser")
                .long("cookies-from-browser")
                .value_name("BROWSER")
                .num_args(0..=1)
                .default_missing_value(DEFAULT_COOKIE_BROWSER)
                .conflicts_with("no-cookies")
                .help("Read cookies from a browser profile"),
        )
        .arg(
            Arg::new("no-cookies")
                .long("no-cookies")
                .action(ArgAction::SetTrue)
                .help("Send no cookies"),
        );

    FLAG_PAIRS.iter().fold(cmd, |cmd, (on, off, _)| {
        cmd.arg(
            Arg::new(*on)
                .long(*on)
                .action(ArgAction::SetTrue)
                .conflicts_with(*off)
                .help(flag_help(on)),
        )
        .arg(
            Arg::new(*off)
                .long(*off)
                .action(ArgAction::SetTrue)
                .help(flag_help(off)),
        )
    })
}

fn flag_help(id: &str) -> &'static str {
    match id {
        "recode" => "Recode video into the recode target",
        "no-recode" => "Keep the downloaded video container",
        "embed-thumbnail" => "Embed the thumbnail as cover art",
        "no-embed-thumbnail" => "Do not embed the thumbnail",
        "add-metadata" => "Write metadata tags",
        "no-add-metadata" => "Do not write metadata tags",
        "force-overwrite" => "Overwrite existing files",
        "no-force-overwrite" => "Keep existing files",
        "no-playlist" => "Download only the video, not its playlist",
        "playlist" => "Allow playlist downloads",
        _ => "",
    }
}

/// True when the option was typed on the command line
fn given(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Apply every option given on the command line to the form
pub fn apply(matches: &ArgMatches, form: &mut FormState) -> Result<()> {
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        validation::validate_directory_path(dir)?;
        form.update(|config| config.output_dir = absolute(Path::new(dir.trim())));
    }

    let values = [
        ("format", KEY_FORMAT),
        ("audio-format", KEY_AUDIO_FORMAT),
        ("audio-quality", KEY_AUDIO_QUALITY),
        ("recode-target", KEY_RECODE_VIDEO),
        ("user-agent", KEY_USER_AGENT),
    ];
    for (id, key) in values {
        if let Some(value) = matches.get_one::<String>(id) {
            form.set(key, value)
                .with_context(|| format!("Invalid value for --{}", id))?;
        }
    }

    for (on, off, key) in FLAG_PAIRS {
        if matches.get_flag(on) {
            form.set(key, "1")?;
        } else if matches.get_flag(off) {
            form.set(key, "0")?;
        }
    }

    if let Some(policy) = cookie_policy(matches) {
        form.set_cookie_policy(&policy);
    }

    Ok(())
}

/// Cookie policy requested on the command line, if any
pub fn cookie_policy(matches: &ArgMatches) -> Option<CookiePolicy> {
    if matches.get_flag("no-cookies") {
        return Some(CookiePolicy::None);
    }
    if let Some(file) = matches.get_one::<String>("cookies") {
        return Some(CookiePolicy::FromFile(absolute(Path::new(file.trim()))));
    }
    matches
        .get_one::<String>("cookies-from-browser")
        .map(|name| CookiePolicy::FromBrowser(name.trim().to_string()))
}

/// Options given for controls that do not apply to the current mode
pub fn ignored_options(matches: &ArgMatches, controls: &ControlStates) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    let checks: [(&'static str, bool); 5] = [
        ("audio-format", controls.audio_format),
        ("audio-quality", controls.audio_quality),
        ("recode", controls.recode_toggle),
        ("no-recode", controls.recode_toggle),
        ("recode-target", controls.recode_target),
    ];
    for (id, enabled) in checks {
        if !enabled && given(matches, id) {
            ignored.push(id);
        }
    }
    ignored
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
