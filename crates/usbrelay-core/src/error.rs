//! Driver-level errors.

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Open or close did not reach its postcondition.
    #[error("Connection error on {port}: {reason}")]
    Connection { port: String, reason: String },

    /// A frame or byte write did not fully complete.
    #[error("Transmit failed for relay {relay}: {source}")]
    Transmit {
        relay: u8,
        #[source]
        source: TransportError,
    },

    #[error("Short write for relay {relay}: wrote {written} of {expected} bytes")]
    ShortWrite {
        relay: u8,
        written: usize,
        expected: usize,
    },

    #[error("Receive timed out after {timeout_ms}ms")]
    ReceiveTimeout { timeout_ms: u64 },

    #[error("Receive failed: {0}")]
    Receive(#[source] TransportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Board is not connected")]
    NotConnected,
}

impl RelayError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RelayError::InvalidArgument(message.into())
    }

    /// Whether this failure happened while sending a frame.
    pub fn is_transmit(&self) -> bool {
        matches!(
            self,
            RelayError::Transmit { .. } | RelayError::ShortWrite { .. }
        )
    }
}
