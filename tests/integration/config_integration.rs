//! Integration tests for Configuration System

use super::test_utils::with_isolated_env;
use nanoforge::api::NanoforgeClient;
use nanoforge::config::{global_config_path, ConfigLoader};
use nanoforge::error::ApiError;
use nanoforge::models::ModelKind;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_defaults_without_any_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    let config = with_isolated_env(&test_dir, &[], || ConfigLoader::load(&workspace).unwrap());

    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.initial_delay_ms, 1000);
    assert_eq!(config.api.connect_timeout_secs, 10);
    assert_eq!(config.logging.output, "stderr");
    assert_eq!(config.model_registry().len(), 4);
}

#[test]
fn test_layer_precedence() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");

    write(
        &test_dir.path().join("xdg/nanoforge/config.toml"),
        r#"
[retry]
max_attempts = 4
initial_delay_ms = 250

[api]
request_timeout_secs = 60
"#,
    );
    write(
        &workspace.join("config/config.toml"),
        r#"
[retry]
max_attempts = 5

[[models]]
name = "Imagen 4"
id = "models/imagen-4.0-generate-001"
"#,
    );
    write(
        &workspace.join("config/staging.toml"),
        r#"
[api]
request_timeout_secs = 30
"#,
    );

    let config = with_isolated_env(
        &test_dir,
        &[
            ("NANOFORGE_ENV", "staging"),
            ("NANOFORGE__RETRY__MAX_ATTEMPTS", "7"),
        ],
        || {
            assert_eq!(
                global_config_path().unwrap(),
                test_dir.path().join("xdg/nanoforge/config.toml")
            );
            ConfigLoader::load(&workspace).unwrap()
        },
    );

    assert_eq!(config.retry.initial_delay_ms, 250, "global file applies");
    assert_eq!(config.api.request_timeout_secs, 30, "env-specific file wins");
    assert_eq!(config.retry.max_attempts, 7, "environment variable wins");
    let imagen4 = config.model_registry().resolve("Imagen 4").unwrap();
    assert_eq!(imagen4.kind, ModelKind::ImageBatch);
}

#[test]
fn test_invalid_config_rejected_by_client() {
    let test_dir = TempDir::new().unwrap();
    let config_file = test_dir.path().join("nanoforge.toml");
    write(
        &config_file,
        r#"
[api]
api_key = "test-key"
connect_timeout_secs = 0

[retry]
max_attempts = 0
"#,
    );

    let config = with_isolated_env(&test_dir, &[], || {
        ConfigLoader::load_from_file(&config_file).unwrap()
    });
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);

    match NanoforgeClient::from_config(&config) {
        Err(ApiError::ConfigError(message)) => {
            assert!(message.contains("max_attempts"));
            assert!(message.contains("timeouts"));
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("invalid configuration accepted"),
    }
}

#[test]
fn test_missing_api_key_reported() {
    let test_dir = TempDir::new().unwrap();
    let config_file = test_dir.path().join("nanoforge.toml");
    write(
        &config_file,
        r#"
[api]
api_key_env = "NANOFORGE_INTEGRATION_UNSET_KEY"
"#,
    );

    let result = with_isolated_env(&test_dir, &[], || {
        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        NanoforgeClient::from_config(&config).map(|_| ())
    });

    assert!(matches!(
        result,
        Err(ApiError::MissingApiKey(name)) if name == "NANOFORGE_INTEGRATION_UNSET_KEY"
    ));
}

#[test]
fn test_api_key_from_environment_override() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    let key = with_isolated_env(&test_dir, &[("NANOFORGE__API__API_KEY", "env-key")], || {
        ConfigLoader::load(&workspace)
            .unwrap()
            .api
            .resolve_api_key()
            .unwrap()
    });
    assert_eq!(key, "env-key");
}
