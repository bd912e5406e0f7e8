pub mod discovery;
pub mod manager;
pub mod models;
pub mod status;

pub use manager::{AlwaysCancel, ConnectionResult, HardwareSession, RetryDecision, RetryPrompt};
pub use models::*;
pub use status::{HardwareStatus, StatusTracker};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No {0} found")]
    NotFound(DeviceClass),

    #[error("Could not open {port}: {message}")]
    OpenFailed { port: String, message: String },

    #[error("{0} not connected")]
    NotConnected(DeviceKind),

    #[error("Serial communication error: {0}")]
    SerialError(#[from] crate::serial::SerialError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
