//! ConfigStore persistence tests against a real temp directory.

use launchdeck_core::{AppConfig, ConfigError, ConfigStore, ProgramEntry, Theme};

fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
    ConfigStore::new(dir.path().join("config.json"))
}

#[test]
fn test_round_trip_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let config = AppConfig {
        theme: Theme::Green,
        programs: vec![
            ProgramEntry::new("编辑器", "C:\\Tools\\editor.exe"),
            ProgramEntry::new("编辑器", "C:\\Tools\\editor.exe"),
            ProgramEntry::new("browser", "/usr/bin/browser"),
        ],
        weather_visible: true,
        weather_api_key: Some("abc123".to_string()),
    };

    assert!(store.save(&config));
    assert_eq!(store.load(), config);
}

#[test]
fn test_round_trip_empty_programs_and_null_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let config = AppConfig::default();
    assert!(store.save(&config));
    assert_eq!(store.try_load().unwrap(), config);

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["weather_api_key"].is_null());
    assert_eq!(value["programs"], serde_json::json!([]));
}

#[test]
fn test_non_ascii_written_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(store.save(&AppConfig {
        theme: Theme::Dark,
        ..AppConfig::default()
    }));

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("黑色主题"));
}

#[test]
fn test_missing_file_yields_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(matches!(store.try_load(), Err(ConfigError::NotFound(_))));
    assert_eq!(store.load(), AppConfig::default());
}

#[test]
fn test_corrupt_file_yields_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{ \"theme\": ").unwrap();

    assert!(matches!(store.try_load(), Err(ConfigError::Parse(_))));
    assert_eq!(store.load(), AppConfig::default());
}

#[test]
fn test_missing_weather_visible_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(
        store.path(),
        r#"{"theme": "默认主题", "programs": [{"name": "a", "path": "/a"}], "weather_api_key": null}"#,
    )
    .unwrap();

    let config = store.load();
    assert!(!config.weather_visible);
    assert_eq!(config.programs, vec![ProgramEntry::new("a", "/a")]);
}

#[test]
fn test_save_creates_parent_and_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("nested").join("config.json"));

    assert!(store.save(&AppConfig::default()));
    assert!(store.path().exists());

    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_save_overwrites_previous_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut config = AppConfig::default();
    config.programs.push(ProgramEntry::new("one", "/one"));
    assert!(store.save(&config));

    config.programs.clear();
    config.weather_visible = true;
    assert!(store.save(&config));

    assert_eq!(store.load(), config);
}

#[test]
fn test_save_failure_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the parent directory should be.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let store = ConfigStore::new(blocker.join("config.json"));

    assert!(!store.save(&AppConfig::default()));
    assert!(matches!(
        store.try_save(&AppConfig::default()),
        Err(ConfigError::Write { .. })
    ));
}
