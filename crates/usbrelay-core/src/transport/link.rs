//! Connection ownership and pacing on top of a [`SerialTransport`].

use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::traits::{SerialTransport, TransportError};
use crate::error::RelayError;
use crate::protocol::constants::{OPEN_SETTLE_DELAY, RECEIVE_TIMEOUT};
use crate::trace::TraceBuffer;

/// Exclusive owner of one transport handle and its diagnostic traces.
///
/// The handle is released when the link is dropped, on every exit path.
pub struct SerialLink<T: SerialTransport> {
    transport: T,
    handle: Option<T::Handle>,
    port: Option<String>,
    tx_trace: TraceBuffer,
    rx_trace: TraceBuffer,
}

impl<T: SerialTransport> SerialLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            handle: None,
            port: None,
            tx_trace: TraceBuffer::new(),
            rx_trace: TraceBuffer::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Name of the currently open port.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn tx_trace(&self) -> &TraceBuffer {
        &self.tx_trace
    }

    pub fn rx_trace(&self) -> &TraceBuffer {
        &self.rx_trace
    }

    /// Open `port`, wait for it to settle and verify it reports open.
    ///
    /// An existing handle is closed first.
    pub fn open(&mut self, port: &str, baud_rate: u32) -> Result<(), RelayError> {
        if self.handle.is_some() {
            self.close()?;
        }

        let mut handle =
            self.transport
                .open(port, baud_rate)
                .map_err(|e| RelayError::Connection {
                    port: port.to_string(),
                    reason: e.to_string(),
                })?;

        thread::sleep(OPEN_SETTLE_DELAY);

        if !self.transport.is_open(&handle) {
            if let Err(e) = self.transport.close(&mut handle) {
                warn!(port = %port, error = %e, "Failed to release half-open port");
            }
            return Err(RelayError::Connection {
                port: port.to_string(),
                reason: "port not open after settle delay".into(),
            });
        }

        debug!(port = %port, baud_rate, "Link open");
        self.handle = Some(handle);
        self.port = Some(port.to_string());
        Ok(())
    }

    /// Close the handle and verify the port no longer reports open.
    ///
    /// If the port still reports open the handle is kept, so a later close
    /// or drop retries the release.
    pub fn close(&mut self) -> Result<(), RelayError> {
        let port = self.port.clone().unwrap_or_default();
        let handle = self.handle.as_mut().ok_or(RelayError::NotConnected)?;

        self.transport
            .close(handle)
            .map_err(|e| RelayError::Connection {
                port: port.clone(),
                reason: e.to_string(),
            })?;

        if self.transport.is_open(handle) {
            return Err(RelayError::Connection {
                port,
                reason: "port still open after close".into(),
            });
        }

        debug!(port = %port, "Link closed");
        self.handle = None;
        self.port = None;
        Ok(())
    }

    /// Write `bytes` for `relay` in a single transport call.
    ///
    /// Bytes enter the tx trace in write order before the call is made.
    pub fn write_chunk(&mut self, relay: u8, bytes: &[u8]) -> Result<(), RelayError> {
        let handle = self.handle.as_mut().ok_or(RelayError::NotConnected)?;
        self.tx_trace.extend(bytes);

        let written = self
            .transport
            .write_bytes(handle, bytes)
            .map_err(|source| RelayError::Transmit { relay, source })?;

        if written != bytes.len() {
            return Err(RelayError::ShortWrite {
                relay,
                written,
                expected: bytes.len(),
            });
        }
        trace!(relay, bytes = ?bytes, "Chunk written");
        Ok(())
    }

    /// Block for `delay`.
    pub fn pace(&self, delay: Duration) {
        if !delay.is_zero() {
            self.transport.pause(delay);
        }
    }

    /// Read up to `n` bytes, stopping at the first failed read.
    pub fn receive_bytes(&mut self, n: usize) -> Result<Vec<u8>, RelayError> {
        let handle = self.handle.as_mut().ok_or(RelayError::NotConnected)?;
        let mut received = Vec::with_capacity(n);

        for _ in 0..n {
            match self.transport.read_byte(handle, RECEIVE_TIMEOUT) {
                Ok(byte) => {
                    self.rx_trace.append(byte);
                    received.push(byte);
                }
                Err(TransportError::Timeout { timeout_ms }) => {
                    return Err(RelayError::ReceiveTimeout { timeout_ms });
                }
                Err(e) => return Err(RelayError::Receive(e)),
            }
        }
        Ok(received)
    }
}

impl<T: SerialTransport> Drop for SerialLink<T> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let port = self.port.take().unwrap_or_default();
            match self.transport.close(&mut handle) {
                Ok(()) => debug!(port = %port, "Link released on drop"),
                Err(e) => warn!(port = %port, error = %e, "Failed to release link on drop"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockOp, MockTransport};

    #[test]
    fn test_open_verifies_port_reports_open() {
        let mock = MockTransport::new().reports_closed_after_open();
        let mut link = SerialLink::new(mock.clone());
        assert!(matches!(
            link.open("DEV0", 9600),
            Err(RelayError::Connection { .. })
        ));
        assert!(!link.is_connected());
        // The half-open handle was handed back to the transport.
        assert_eq!(
            mock.ops(),
            vec![
                MockOp::Open {
                    port: "DEV0".into(),
                    baud_rate: 9600
                },
                MockOp::Close {
                    port: "DEV0".into()
                },
            ]
        );
    }

    #[test]
    fn test_close_verifies_port_reports_closed() {
        let mock = MockTransport::new().stays_open_after_close();
        let mut link = SerialLink::new(mock);
        link.open("DEV0", 9600).unwrap();
        assert!(matches!(link.close(), Err(RelayError::Connection { .. })));
        assert!(link.is_connected());
    }

    #[test]
    fn test_close_failure_is_retried() {
        let mock = MockTransport::new().fails_close_once();
        let mut link = SerialLink::new(mock.clone());
        link.open("DEV0", 9600).unwrap();

        let err = link.close().unwrap_err();
        assert!(matches!(&err, RelayError::Connection { reason, .. } if reason.contains("flush")));
        assert!(link.is_connected());

        link.close().unwrap();
        assert!(!link.is_connected());
    }

    #[test]
    fn test_close_without_open() {
        let mut link = SerialLink::new(MockTransport::new());
        assert!(matches!(link.close(), Err(RelayError::NotConnected)));
    }

    #[test]
    fn test_drop_releases_handle() {
        let mock = MockTransport::new();
        {
            let mut link = SerialLink::new(mock.clone());
            link.open("DEV0", 9600).unwrap();
        }
        assert_eq!(
            mock.ops().last(),
            Some(&MockOp::Close {
                port: "DEV0".into()
            })
        );
    }

    #[test]
    fn test_write_chunk_traces_and_detects_short_write() {
        let mock = MockTransport::new().short_write_at(2);
        let mut link = SerialLink::new(mock);
        link.open("DEV0", 9600).unwrap();

        link.write_chunk(1, &[0xA0, 0x01, 0x00, 0xA1]).unwrap();
        assert_eq!(link.tx_trace().snapshot(), vec![0xA1, 0x00, 0x01, 0xA0]);

        assert!(matches!(
            link.write_chunk(2, &[0xA0, 0x02, 0x00, 0xA2]),
            Err(RelayError::ShortWrite {
                relay: 2,
                written: 3,
                expected: 4
            })
        ));
    }

    #[test]
    fn test_receive_stops_at_first_timeout() {
        let mock = MockTransport::new();
        let mut link = SerialLink::new(mock.clone());
        link.open("DEV0", 9600).unwrap();
        mock.queue_rx(&[0x10, 0x20]);

        assert!(matches!(
            link.receive_bytes(4),
            Err(RelayError::ReceiveTimeout { timeout_ms: 500 })
        ));
        assert_eq!(link.rx_trace().snapshot(), vec![0x20, 0x10]);
        let reads = mock.ops().iter().filter(|op| **op == MockOp::Read).count();
        assert_eq!(reads, 3);
    }

    #[test]
    fn test_receive_without_open() {
        let mut link = SerialLink::new(MockTransport::new());
        assert!(matches!(
            link.receive_bytes(1),
            Err(RelayError::NotConnected)
        ));
    }
}
