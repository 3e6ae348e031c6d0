//! Error types for bench device I/O.

use thiserror::Error;

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// The link to the device failed outright.
    #[error("{device}: communication failed: {source}")]
    Transport {
        device: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The device answered, but not with a number.
    #[error("{device}: unparseable reply to '{command}': {reply:?}")]
    Parse {
        device: &'static str,
        command: &'static str,
        reply: String,
    },

    #[error("{device} is closed")]
    Closed { device: &'static str },

    #[error("No serial port matching '{pattern}'")]
    NotFound { pattern: String },
}

impl DeviceError {
    pub(crate) fn transport(device: &'static str, source: std::io::Error) -> Self {
        DeviceError::Transport { device, source }
    }

    /// Whether this error means the device cannot be talked to at all.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DeviceError::Transport { .. } | DeviceError::Serial(_) | DeviceError::Closed { .. }
        )
    }
}
