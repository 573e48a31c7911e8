//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// State store read, parse, or write failure.
    Store(String),
    /// Agent process could not be launched.
    Spawn(String),
    /// External work source (GitHub) query failure.
    Source(String),
    /// Notification delivery failure.
    Notify(String),
    /// Malformed hook protocol input.
    Hook(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Store(msg) => write!(f, "store: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Source(msg) => write!(f, "source: {msg}"),
            Self::Notify(msg) => write!(f, "notify: {msg}"),
            Self::Hook(msg) => write!(f, "hook: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("invalid json: {err}"))
    }
}
