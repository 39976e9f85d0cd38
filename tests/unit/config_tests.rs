use std::io::Write;
use std::time::Duration;

use zxtouch_ipc::config::{DEFAULT_ENDPOINT_NAME, DEFAULT_MAX_MESSAGE_BYTES};
use zxtouch_ipc::ipc::channel::ChannelOptions;
use zxtouch_ipc::{AppError, GlobalConfig};

fn sample_toml() -> &'static str {
    r#"
endpoint_name = "com.example.test-daemon"
connect_timeout_ms = 250
request_timeout_ms = 750
max_message_bytes = 4096
"#
}

#[test]
fn parses_valid_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("config parses");

    assert_eq!(config.endpoint_name.as_str(), "com.example.test-daemon");
    assert_eq!(config.connect_timeout(), Duration::from_millis(250));
    assert_eq!(config.request_timeout(), Duration::from_millis(750));
    assert_eq!(config.max_message_bytes, 4096);
}

#[test]
fn empty_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.endpoint_name.as_str(), DEFAULT_ENDPOINT_NAME);
    assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
    assert!(config.request_timeout() > Duration::ZERO);
}

#[test]
fn rejects_zero_request_timeout() {
    let err = GlobalConfig::from_toml_str("request_timeout_ms = 0").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("request_timeout_ms")));
}

#[test]
fn rejects_zero_connect_timeout() {
    let err = GlobalConfig::from_toml_str("connect_timeout_ms = 0").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("connect_timeout_ms")));
}

#[test]
fn rejects_zero_message_limit() {
    let err = GlobalConfig::from_toml_str("max_message_bytes = 0").unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn rejects_empty_endpoint_name() {
    let err = GlobalConfig::from_toml_str(r#"endpoint_name = """#).unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn rejects_unknown_keys() {
    let err = GlobalConfig::from_toml_str("ipc_name = \"old\"").unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn loads_from_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(sample_toml().as_bytes()).expect("write config");

    let config = GlobalConfig::load_from_path(file.path()).expect("config loads");
    assert_eq!(config.request_timeout_ms, 750);
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = GlobalConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("failed to read config")));
}

#[test]
fn channel_options_follow_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).unwrap();
    let options = ChannelOptions::from(&config);

    assert_eq!(options.connect_timeout, Duration::from_millis(250));
    assert_eq!(options.request_timeout, Duration::from_millis(750));
    assert_eq!(options.max_message_bytes, 4096);
}
