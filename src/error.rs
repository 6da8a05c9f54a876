// error.rs

use thiserror::Error;

/// Errors surfaced by the intersection environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("Invalid action {0}: expected 0 (north-south green) or 1 (east-west green)")]
    InvalidAction(usize),
}

/// Errors raised while writing the value table to disk.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Table I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Environment override {var}={value} is not valid")]
    InvalidOverride { var: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
