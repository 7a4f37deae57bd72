//! Integration tests for Settings config loading with layered overlay semantics.
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config overlays on the defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use coasync::application::ApplicationError;
use coasync::config::{local_config_path, Settings};
use coasync::domain::DomainError;

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config = r#"
store_path = "/tmp/coasync-test/store.json"
path_separator = "/"
has_headers = true

[columns]
id = "B"
range_b = "P"
"#;
    fs::write(local_config_path(dir.path()), config).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.store_path, PathBuf::from("/tmp/coasync-test/store.json"));
    assert_eq!(settings.path_separator, "/");
    assert!(settings.has_headers);
    assert_eq!(settings.columns.id, "B");
    assert_eq!(settings.columns.range_b, "P");
    assert_eq!(settings.columns.group, "B", "unspecified columns keep defaults");
    assert_eq!(settings.columns.name, "C");
}

#[test]
fn given_no_local_config_when_load_then_uses_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.path_separator, "-");
    let map = settings.columns.to_column_map().expect("columns");
    assert_eq!((map.id, map.group, map.name), (0, 1, 2));
    assert_eq!((map.range_a, map.range_b), (12, 13));
}

#[test]
fn given_invalid_column_when_load_then_fails_validation() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "[columns]\nname = \"3\"\n").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidColumn(_)))
    ));
}

#[test]
fn given_malformed_toml_when_load_then_reports_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "path_separator = [").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_tilde_store_path_when_load_then_expands_home() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "store_path = \"~/books/store.json\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    let store = settings.store_path.to_string_lossy().to_string();
    assert!(!store.starts_with('~'), "{}", store);
    assert!(store.ends_with("books/store.json"));
}

#[test]
fn given_settings_when_rendering_toml_then_round_trips() {
    let settings = Settings::default();

    let rendered = settings.to_toml().expect("render");
    let parsed: Settings = toml::from_str(&rendered).expect("parse");

    assert_eq!(parsed, settings);
}
