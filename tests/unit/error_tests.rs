//! Unit tests for `AppError` display and conversions.

use agentize_fleet::AppError;

#[test]
fn display_prefixes_variant() {
    assert_eq!(AppError::Config("bad".into()).to_string(), "config: bad");
    assert_eq!(AppError::Store("bad".into()).to_string(), "store: bad");
    assert_eq!(AppError::Spawn("bad".into()).to_string(), "spawn: bad");
    assert_eq!(AppError::Source("bad".into()).to_string(), "source: bad");
    assert_eq!(AppError::Notify("bad".into()).to_string(), "notify: bad");
    assert_eq!(AppError::Hook("bad".into()).to_string(), "hook: bad");
    assert_eq!(AppError::Io("bad".into()).to_string(), "io: bad");
}

#[test]
fn toml_errors_become_config_errors() {
    let err: AppError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn json_errors_become_store_errors() {
    let err: AppError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert!(matches!(err, AppError::Store(ref msg) if msg.starts_with("invalid json")));
}
