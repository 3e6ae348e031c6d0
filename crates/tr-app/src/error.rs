//! Error types for the tr-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the backend crates' errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file: {path}")]
    ConfigFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("Control error: {0}")]
    Control(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Failed to install signal handler for {signal}: {source}")]
    Signal {
        signal: &'static str,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tr-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<tr_controls::ControlError> for AppError {
    fn from(err: tr_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}

impl From<tr_devices::DeviceError> for AppError {
    fn from(err: tr_devices::DeviceError) -> Self {
        AppError::Device(err.to_string())
    }
}

impl From<tr_results::ResultsError> for AppError {
    fn from(err: tr_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
