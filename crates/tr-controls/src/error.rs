//! Error types for control system operations.

use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while configuring a controller.
///
/// Stepping a configured controller never fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

impl From<tr_core::TrError> for ControlError {
    fn from(err: tr_core::TrError) -> Self {
        match err {
            tr_core::TrError::NonFinite { what, .. } | tr_core::TrError::InvalidArg { what } => {
                ControlError::InvalidArg { what }
            }
        }
    }
}
