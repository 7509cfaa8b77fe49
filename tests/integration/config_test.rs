use std::path::PathBuf;
use tempfile::TempDir;
use vfetch::core::config::{Config, ALL_KEYS, KEY_COOKIES, KEY_COOKIE_FILE, KEY_OUTDIR};
use vfetch::core::CookiePolicy;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.format, "1080p");
    assert_eq!(config.audio_format, "mp3");
    assert_eq!(config.audio_quality, "0");
    assert_eq!(config.recode_target, "mp4");
    assert!(config.recode_enabled);
    assert_eq!(config.cookie_policy(), CookiePolicy::None);
}

#[test]
fn test_every_key_is_written() {
    let text = Config::default().to_text();
    for key in ALL_KEYS {
        assert!(
            text.lines().any(|line| line.starts_with(&format!("{}=", key))),
            "missing {}",
            key
        );
    }
}

#[test]
fn test_keys_are_case_insensitive() {
    let mut config = Config::default();
    config.set("last_format", "240p").unwrap();
    assert_eq!(config.get("LAST_FORMAT").as_deref(), Some("240p"));
}

#[test]
fn test_cookie_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config");

    let mut config = Config::default();
    config.set(KEY_COOKIES, "file").unwrap();
    config.set(KEY_COOKIE_FILE, "/tmp/cookies.txt").unwrap();
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(
        loaded.cookie_policy(),
        CookiePolicy::FromFile(PathBuf::from("/tmp/cookies.txt"))
    );
}

#[test]
fn test_empty_outdir_keeps_previous() {
    let mut config = Config::default();
    let before = config.output_dir.clone();
    config.set(KEY_OUTDIR, "   ").unwrap();
    assert_eq!(config.output_dir, before);
}

#[test]
fn test_json_has_named_fields() {
    let json = serde_json::to_value(Config::default()).unwrap();
    assert_eq!(json["format"], "1080p");
    assert_eq!(json["recode_enabled"], true);
}
