use chat_sync_client::config::ClientConfig;
use serial_test::serial;
use std::env;
use std::fs;

const BIN: &str = "chat-sync-client";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    // SAFETY: every test touching the environment is #[serial].
    unsafe {
        env::remove_var("CHAT_API__BASE_URL");
        env::remove_var("CHAT_API__TIMEOUT_SECS");
        env::remove_var("CHAT_STORAGE__EPHEMERAL");
        env::remove_var("CHAT_API_URL");
        env::remove_var("CHAT_STATE_FILE");
        env::remove_var("CONFIG_FILE");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = ClientConfig::load_from_args([BIN]).expect("defaults should load");
    assert_eq!(config.api.base_url, "http://localhost:8080/api");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(
        config.storage.path,
        std::path::PathBuf::from(".chat-client/state.json")
    );
    assert!(!config.storage.ephemeral);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    // SAFETY: serialized test.
    unsafe {
        env::set_var("CHAT_API__BASE_URL", "http://api.internal:9090/api");
        env::set_var("CHAT_API__TIMEOUT_SECS", "5");
    }

    let config = ClientConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.api.base_url, "http://api.internal:9090/api");
    assert_eq!(config.api.timeout_secs, 5);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_beats_environment() {
    clear_env_vars();
    // SAFETY: serialized test.
    unsafe {
        env::set_var("CHAT_API__BASE_URL", "http://from-env/api");
    }

    let config = ClientConfig::load_from_args([
        BIN,
        "--base-url",
        "http://from-cli/api",
        "--ephemeral",
        "--state-file",
        "/tmp/chat-state.json",
    ])
    .expect("Failed to load config");
    assert_eq!(config.api.base_url, "http://from-cli/api");
    assert!(config.storage.ephemeral);
    assert_eq!(
        config.storage.path,
        std::path::PathBuf::from("/tmp/chat-state.json")
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("client.yaml");
    let config_content = r#"
api:
  base_url: "http://from-file:7070/api"
  timeout_secs: 12
    "#;
    fs::write(&file_path, config_content).expect("Failed to write temp config");

    // Tell ClientConfig to use this file via Env Var (mocking CLI arg indirectly)
    // SAFETY: serialized test.
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = ClientConfig::load_from_args([BIN]).expect("Failed to load config from file");
    assert_eq!(config.api.base_url, "http://from-file:7070/api");
    assert_eq!(config.api.timeout_secs, 12);

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env_vars();

    let result = ClientConfig::load_from_args([BIN, "--config", "/nonexistent/client.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    // Create ./chat-client.yaml
    let config_content = r#"
storage:
  ephemeral: true
    "#;
    let cwd_path = "chat-client.yaml";
    fs::write(cwd_path, config_content).expect("Failed to write ./chat-client.yaml");

    let config = ClientConfig::load_from_args([BIN]);

    fs::remove_file(cwd_path).unwrap();

    let config = config.expect("Failed to load config");
    assert!(config.storage.ephemeral);
}
