//! Integration tests for configuration layering

use crate::integration::test_utils::with_config_env;
use groovemate::config::ConfigLoader;
use groovemate::error::ConfigError;
use groovemate::transport::RetryPolicy;
use std::time::Duration;
use tempfile::TempDir;

fn write_global(test_dir: &TempDir, contents: &str) {
    let dir = test_dir.path().join("groovemate");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_defaults_without_any_source() {
    let test_dir = TempDir::new().unwrap();
    let config = with_config_env(&test_dir, &[], || ConfigLoader::load(None)).unwrap();

    assert_eq!(config.lifecycle.max_attempts, 3);
    assert_eq!(config.lifecycle.retry_delay(), Duration::from_secs(1));
    assert_eq!(config.lifecycle.navigation_debounce(), Duration::from_secs(1));
    assert_eq!(config.transport.response_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.page.ticket_host_marker, "groovehq.com/tickets/");
}

#[test]
fn test_layers_apply_in_order() {
    let test_dir = TempDir::new().unwrap();
    write_global(
        &test_dir,
        r#"
[transport]
max_attempts = 4
retry_backoff_ms = 100

[page]
sidebar_width = "360px"
"#,
    );
    let explicit = test_dir.path().join("project.toml");
    std::fs::write(
        &explicit,
        r#"
[transport]
retry_backoff_ms = 200

[models]
balanced = "llama-3.3-70b-versatile"
"#,
    )
    .unwrap();

    let config = with_config_env(
        &test_dir,
        &[("GROOVEMATE_TRANSPORT__RETRY_BACKOFF_MS", "250")],
        || ConfigLoader::load(Some(&explicit)),
    )
    .unwrap();

    assert_eq!(config.transport.max_attempts, 4);
    assert_eq!(config.page.sidebar_width, "360px");
    assert_eq!(config.models.balanced, "llama-3.3-70b-versatile");
    assert_eq!(config.transport.retry_backoff_ms, 250);

    let policy = RetryPolicy::from(&config.transport);
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.backoff, Duration::from_millis(250));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let test_dir = TempDir::new().unwrap();
    let missing = test_dir.path().join("nope.toml");

    let result = with_config_env(&test_dir, &[], || ConfigLoader::load(Some(&missing)));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_invalid_layer_is_rejected() {
    let test_dir = TempDir::new().unwrap();
    write_global(
        &test_dir,
        r#"
[endpoints]
groove_base_url = "ftp://api.groovehq.com"

[page]
ticket_url_pattern = "/tickets/\\d+"
"#,
    );

    let err = with_config_env(&test_dir, &[], || ConfigLoader::load(None)).unwrap_err();
    match err {
        ConfigError::Invalid(message) => {
            assert!(message.contains("groove_base_url"));
            assert!(message.contains("capture group"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}
