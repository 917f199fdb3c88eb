use super::*;

use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("flashcards_desktop_test_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn command_line_override_wins_and_is_normalized() {
    let settings =
        load_settings(None, Some(" http://decks.local:8080/ ".to_string())).expect("settings");
    assert_eq!(settings.server_url, "http://decks.local:8080");
}

#[test]
fn reads_server_url_from_config_file() {
    let path = temp_config(r#"server_url = "http://10.0.0.2:5000""#);
    let settings = load_settings(Some(&path), None).expect("settings");
    assert_eq!(settings.server_url, "http://10.0.0.2:5000");

    let settings =
        load_settings(Some(&path), Some("http://override:1".to_string())).expect("settings");
    assert_eq!(settings.server_url, "http://override:1");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let missing = env::temp_dir().join("flashcards_desktop_missing_config.toml");
    assert!(load_settings(Some(&missing), None).is_err());
}
