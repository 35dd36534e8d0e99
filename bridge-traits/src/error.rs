use std::time::Duration;
use thiserror::Error;

/// Failures reported by a host capability
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The capability could not be set up on this host (e.g. TLS backend)
    #[error("Host capability unavailable: {0}")]
    NotAvailable(String),

    /// The request was sent but no usable response came back
    #[error("Host operation failed: {0}")]
    OperationFailed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
