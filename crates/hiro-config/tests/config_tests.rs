//! Configuration loading and precedence tests

use hiro_config::{ConfigError, ConfigLoader, DEFAULT_POLL_INTERVAL_MS};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> PathBuf {
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

fn loader_with_global(temp_dir: &TempDir, global: Option<&str>) -> ConfigLoader {
    let global_path = temp_dir.path().join("global.toml");
    if let Some(content) = global {
        write_file(&global_path, content);
    }
    ConfigLoader::new().with_global_config_path(global_path)
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_runner_and_reporter_tables() {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        &temp_dir.path().join("hiro.toml"),
        r#"
[runner]
poll_interval_ms = 20
suite = "math"

[reporter]
verbose = true
"#,
    );

    let config = loader_with_global(&temp_dir, None)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(config.poll_interval(), Duration::from_millis(20));
    assert_eq!(config.suite_filter(), Some("math"));
    assert!(config.verbose());
    assert!(config.color());
}

#[test]
#[serial]
fn test_load_from_subdirectory_finds_parent() {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        &temp_dir.path().join("hiro.toml"),
        r#"
[runner]
suite = "parent"
"#,
    );

    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let config = loader_with_global(&temp_dir, None)
        .load_from_directory(&nested)
        .unwrap();

    assert_eq!(config.suite_filter(), Some("parent"));
    assert_eq!(config.project_root(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_missing_project_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let config = loader_with_global(&temp_dir, None)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(!config.is_project());
    assert_eq!(
        config.poll_interval(),
        Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
    );
}

#[test]
#[serial]
fn test_global_reporter_defaults_apply() {
    let temp_dir = TempDir::new().unwrap();
    write_file(&temp_dir.path().join("hiro.toml"), "");

    let config = loader_with_global(
        &temp_dir,
        Some(
            r#"
[reporter]
verbose = true
color = false
"#,
        ),
    )
    .load_from_directory(temp_dir.path())
    .unwrap();

    assert!(config.verbose());
    assert!(!config.color());
}

#[test]
#[serial]
fn test_load_from_specific_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(
        &temp_dir.path().join("custom.toml"),
        r#"
[runner]
poll_interval_ms = 7
"#,
    );

    let config = loader_with_global(&temp_dir, None)
        .load_from_file(&path)
        .unwrap();

    assert_eq!(config.poll_interval(), Duration::from_millis(7));
}

#[test]
fn test_load_missing_specific_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = loader_with_global(&temp_dir, None)
        .load_from_file(&temp_dir.path().join("absent.toml"));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[rstest]
#[case("[runner]\npoll_interval_ms = 0\n")]
#[case("[runner]\npoll_interval_ms = 600000\n")]
#[case("[runner]\nsuite = \"\"\n")]
#[serial]
fn test_invalid_project_values(#[case] content: &str) {
    let temp_dir = TempDir::new().unwrap();
    write_file(&temp_dir.path().join("hiro.toml"), content);

    let result = loader_with_global(&temp_dir, None).load_from_directory(temp_dir.path());

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(&temp_dir.path().join("hiro.toml"), "[runner\n");

    let err = loader_with_global(&temp_dir, None)
        .load_from_directory(temp_dir.path())
        .unwrap_err();

    match err {
        ConfigError::TomlParseError { file, .. } => assert_eq!(file, path),
        other => panic!("expected TomlParseError, got {:?}", other),
    }
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_project_values() {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        &temp_dir.path().join("hiro.toml"),
        r#"
[runner]
poll_interval_ms = 50
suite = "from-file"

[reporter]
verbose = false
color = true
"#,
    );

    env::set_var("HIRO_SUITE", "from-env");
    env::set_var("HIRO_VERBOSE", "yes");
    env::set_var("HIRO_NO_COLOR", "1");

    let config = loader_with_global(&temp_dir, None).load_from_directory(temp_dir.path());

    env::remove_var("HIRO_SUITE");
    env::remove_var("HIRO_VERBOSE");
    env::remove_var("HIRO_NO_COLOR");

    let config = config.unwrap();
    assert_eq!(config.suite_filter(), Some("from-env"));
    assert_eq!(config.poll_interval(), Duration::from_millis(50));
    assert!(config.verbose());
    assert!(!config.color());
}

#[test]
#[serial]
fn test_env_zero_poll_interval_rejected() {
    let temp_dir = TempDir::new().unwrap();

    env::set_var("HIRO_POLL_INTERVAL_MS", "0");
    let result = loader_with_global(&temp_dir, None).load_from_directory(temp_dir.path());
    env::remove_var("HIRO_POLL_INTERVAL_MS");

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
