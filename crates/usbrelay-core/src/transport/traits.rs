//! Serial transport abstraction.
//!
//! Defines the `SerialTransport` trait for byte-level serial access,
//! allowing different implementations (serialport, mock, etc.).

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    #[error("Failed to close port: {0}")]
    CloseFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Port is not open")]
    NotOpen,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract serial transport interface.
///
/// The transport hands out opaque handles; whoever holds a handle owns the
/// underlying descriptor. All calls block until completion or timeout.
pub trait SerialTransport {
    /// Connection handle for one opened port.
    type Handle;

    /// Open `port` at `baud_rate`.
    fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Handle, TransportError>;

    /// Close the port behind `handle`. The handle stays valid for `is_open`.
    fn close(&self, handle: &mut Self::Handle) -> Result<(), TransportError>;

    /// Write `bytes`, returning how many were written.
    fn write_bytes(
        &self,
        handle: &mut Self::Handle,
        bytes: &[u8],
    ) -> Result<usize, TransportError>;

    /// Read a single byte, waiting at most `timeout`.
    fn read_byte(
        &self,
        handle: &mut Self::Handle,
        timeout: Duration,
    ) -> Result<u8, TransportError>;

    /// Check whether the port behind `handle` is open.
    fn is_open(&self, handle: &Self::Handle) -> bool;

    /// Block for `delay` between commands.
    fn pause(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}
