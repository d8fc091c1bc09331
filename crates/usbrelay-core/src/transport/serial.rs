//! serialport-based transport implementation.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, instrument};

use super::traits::{SerialTransport, TransportError};
use crate::protocol::constants::RECEIVE_TIMEOUT;

/// Transport over the host's serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortTransport;

/// An opened serial port. Closing drops the underlying descriptor.
pub struct SerialHandle {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialHandle {
    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl std::fmt::Debug for SerialHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialHandle")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialPortTransport {
    pub fn new() -> Self {
        Self
    }
}

impl SerialTransport for SerialPortTransport {
    type Handle = SerialHandle;

    #[instrument(level = "debug", skip(self))]
    fn open(&self, port: &str, baud_rate: u32) -> Result<SerialHandle, TransportError> {
        // 8N1, no flow control
        let opened = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(RECEIVE_TIMEOUT)
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: port.to_string(),
                message: e.to_string(),
            })?;

        debug!(port = %port, baud_rate, "Serial port opened");
        Ok(SerialHandle {
            name: port.to_string(),
            port: Some(opened),
        })
    }

    fn close(&self, handle: &mut SerialHandle) -> Result<(), TransportError> {
        // The descriptor is dropped even when the final flush fails.
        if let Some(mut port) = handle.port.take() {
            port.flush().map_err(|e| {
                debug!(port = %handle.name, error = %e, "Flush before close failed");
                TransportError::CloseFailed(e.to_string())
            })?;
        }
        Ok(())
    }

    fn write_bytes(
        &self,
        handle: &mut SerialHandle,
        bytes: &[u8],
    ) -> Result<usize, TransportError> {
        let port = handle.port_mut()?;
        port.write_all(bytes).map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        port.flush().map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        Ok(bytes.len())
    }

    fn read_byte(
        &self,
        handle: &mut SerialHandle,
        timeout: Duration,
    ) -> Result<u8, TransportError> {
        let port = handle.port_mut()?;
        port.set_timeout(timeout).map_err(|e| TransportError::ReadFailed(e.to_string()))?;

        let mut buf = [0u8; 1];
        match port.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(TransportError::ReadFailed("port returned no data".into())),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn is_open(&self, handle: &SerialHandle) -> bool {
        handle.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let transport = SerialPortTransport::new();
        let result = transport.open("/definitely/not/a/serial/port", 9600);
        assert!(matches!(result, Err(TransportError::OpenFailed { .. })));
    }
}
