// From command-line options to the downloader argument list, without
// touching the user's real settings file

use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use vfetch::cli::build_cli;
use vfetch::commands::options;
use vfetch::core::{CommandBuilder, Config, CookiePolicy};
use vfetch::ui::form::{DebouncedSaver, FormState};

fn form_in(dir: &TempDir) -> (FormState, PathBuf) {
    let path = dir.path().join("config");
    let config = Config::load_from(&path).unwrap();
    let saver = DebouncedSaver::with_delay(&path, Duration::from_secs(30));
    (FormState::new(config, saver), path)
}

fn sub_matches(args: &[&str]) -> clap::ArgMatches {
    let matches = build_cli().try_get_matches_from(args).unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    sub.clone()
}

#[test]
fn test_preview_options_shape_the_command() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("videos");
    let (mut form, _) = form_in(&dir);

    let matches = sub_matches(&[
        "vfetch",
        "preview",
        "https://example.com/watch?v=1",
        "-o",
        out.to_str().unwrap(),
        "-f",
        "480p",
        "--recode",
        "--recode-target",
        "webm",
        "--no-playlist",
        "--user-agent",
        "TestAgent/1.0",
    ]);
    options::apply(&matches, &mut form).unwrap();

    let request = form.request_for("https://example.com/watch?v=1");
    let args = CommandBuilder::new("yt-dlp").build(&request);

    assert_eq!(args[0], "-o");
    assert!(args[1].starts_with(out.to_str().unwrap()));
    let pos = |flag: &str| args.iter().position(|a| a == flag);
    assert_eq!(args[pos("-f").unwrap() + 1], "bestvideo[height<=480]+bestaudio/best");
    assert_eq!(args[pos("--recode-video").unwrap() + 1], "webm");
    assert_eq!(args[pos("--user-agent").unwrap() + 1], "TestAgent/1.0");
    assert!(pos("--no-playlist").is_some());
    assert_eq!(args.last().unwrap(), "https://example.com/watch?v=1");
}

#[test]
fn test_audio_options_and_ignored_recode() {
    let dir = TempDir::new().unwrap();
    let (mut form, _) = form_in(&dir);

    let matches = sub_matches(&[
        "vfetch",
        "preview",
        "https://example.com/a",
        "-f",
        "Audio",
        "--audio-format",
        "flac",
        "--recode-target",
        "mkv",
    ]);
    options::apply(&matches, &mut form).unwrap();

    let ignored = options::ignored_options(&matches, &form.controls());
    assert_eq!(ignored, vec!["recode-target"]);

    let args = CommandBuilder::new("yt-dlp").build(&form.request_for("https://example.com/a"));
    assert!(args.iter().any(|a| a == "-x"));
    let fmt = args.iter().position(|a| a == "--audio-format").unwrap();
    assert_eq!(args[fmt + 1], "flac");
    assert!(!args.iter().any(|a| a == "--recode-video"));
}

#[test]
fn test_cookie_options_persist_on_close() {
    let dir = TempDir::new().unwrap();
    let (mut form, path) = form_in(&dir);

    let matches = sub_matches(&[
        "vfetch",
        "get",
        "https://example.com/a",
        "--cookies-from-browser",
        "firefox",
        "--embed-thumbnail",
    ]);
    options::apply(&matches, &mut form).unwrap();
    form.close();

    let saved = Config::load_from(&path).unwrap();
    assert_eq!(
        saved.cookie_policy(),
        CookiePolicy::FromBrowser("firefox".to_string())
    );
    assert!(saved.embed_thumbnail);
}

#[test]
fn test_saved_settings_are_reused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config");
    std::fs::write(&path, "LAST_FORMAT=Audio\nLAST_AUDIO_FORMAT=aac\nLAST_ADD_METADATA=1\n").unwrap();

    let (form, _) = form_in(&dir);
    let matches = sub_matches(&["vfetch", "preview", "https://example.com/a"]);
    assert!(options::ignored_options(&matches, &form.controls()).is_empty());

    let args = CommandBuilder::new("yt-dlp").build(&form.request_for("https://example.com/a"));
    let fmt = args.iter().position(|a| a == "--audio-format").unwrap();
    assert_eq!(args[fmt + 1], "aac");
    assert!(args.iter().any(|a| a == "--add-metadata"));
}

#[test]
fn test_invalid_output_dir_rejected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, "x").unwrap();
    let (mut form, _) = form_in(&dir);

    let matches = sub_matches(&[
        "vfetch",
        "preview",
        "https://example.com/a",
        "-o",
        file.to_str().unwrap(),
    ]);
    assert!(options::apply(&matches, &mut form).is_err());
}
