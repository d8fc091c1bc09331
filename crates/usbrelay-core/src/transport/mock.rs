//! Mock serial transport for testing.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{SerialTransport, TransportError};

/// Operation observed by the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    Open { port: String, baud_rate: u32 },
    Close { port: String },
    Write(Vec<u8>),
    Read,
    Pause(Duration),
}

#[derive(Debug, Default)]
struct MockState {
    ops: Vec<MockOp>,
    writes: Vec<Vec<u8>>,
    rx_queue: VecDeque<u8>,
    /// Ports that accept an open. `None` accepts every port.
    accepted_ports: Option<HashSet<String>>,
    /// 1-based write call that fails.
    fail_write_at: Option<usize>,
    /// 1-based write call that reports one byte fewer than requested.
    short_write_at: Option<usize>,
    write_calls: usize,
    open_after_close: bool,
    closed_after_open: bool,
    close_fails_once: bool,
}

/// Mock transport for unit testing driver logic.
///
/// Clones share state, so a test can keep one clone for inspection while
/// the board owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Handle returned by [`MockTransport::open`].
#[derive(Debug)]
pub struct MockHandle {
    port: String,
    open: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept opens for the given ports.
    pub fn accept_only<I, S>(self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accepted = ports.into_iter().map(Into::into).collect();
        self.state.lock().unwrap().accepted_ports = Some(accepted);
        self
    }

    /// Fail the `n`-th write call (1-based).
    pub fn fail_write_at(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_write_at = Some(n);
        self
    }

    /// Make the `n`-th write call (1-based) write one byte fewer than asked.
    pub fn short_write_at(self, n: usize) -> Self {
        self.state.lock().unwrap().short_write_at = Some(n);
        self
    }

    /// Keep reporting the port open after `close`.
    pub fn stays_open_after_close(self) -> Self {
        self.state.lock().unwrap().open_after_close = true;
        self
    }

    /// Report the port closed right after a successful `open`.
    pub fn reports_closed_after_open(self) -> Self {
        self.state.lock().unwrap().closed_after_open = true;
        self
    }

    /// Fail the next `close` after releasing the port, like a flush error.
    pub fn fails_close_once(self) -> Self {
        self.state.lock().unwrap().close_fails_once = true;
        self
    }

    /// Queue bytes to be returned by `read_byte`.
    pub fn queue_rx(&self, bytes: &[u8]) {
        self.state.lock().unwrap().rx_queue.extend(bytes.iter().copied());
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Every write call made, including failed ones.
    pub fn attempted_writes(&self) -> Vec<Vec<u8>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                MockOp::Write(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    /// All captured writes flattened into one byte stream.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.get_writes().concat()
    }

    /// Get the operation log.
    pub fn ops(&self) -> Vec<MockOp> {
        self.state.lock().unwrap().ops.clone()
    }
}

impl SerialTransport for MockTransport {
    type Handle = MockHandle;

    fn open(&self, port: &str, baud_rate: u32) -> Result<MockHandle, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(MockOp::Open {
            port: port.to_string(),
            baud_rate,
        });
        if let Some(accepted) = &state.accepted_ports
            && !accepted.contains(port)
        {
            return Err(TransportError::OpenFailed {
                port: port.to_string(),
                message: "no such device".into(),
            });
        }
        Ok(MockHandle {
            port: port.to_string(),
            open: !state.closed_after_open,
        })
    }

    fn close(&self, handle: &mut MockHandle) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(MockOp::Close {
            port: handle.port.clone(),
        });
        handle.open = state.open_after_close;
        if state.close_fails_once {
            state.close_fails_once = false;
            return Err(TransportError::CloseFailed("injected flush failure".into()));
        }
        Ok(())
    }

    fn write_bytes(
        &self,
        handle: &mut MockHandle,
        bytes: &[u8],
    ) -> Result<usize, TransportError> {
        let mut state = self.state.lock().unwrap();
        if !handle.open {
            return Err(TransportError::NotOpen);
        }
        state.write_calls += 1;
        let call = state.write_calls;
        state.ops.push(MockOp::Write(bytes.to_vec()));
        if state.fail_write_at == Some(call) {
            return Err(TransportError::WriteFailed(format!(
                "injected failure on write {call}"
            )));
        }
        let written = if state.short_write_at == Some(call) {
            bytes.len().saturating_sub(1)
        } else {
            bytes.len()
        };
        state.writes.push(bytes[..written].to_vec());
        Ok(written)
    }

    fn read_byte(
        &self,
        handle: &mut MockHandle,
        timeout: Duration,
    ) -> Result<u8, TransportError> {
        let mut state = self.state.lock().unwrap();
        if !handle.open {
            return Err(TransportError::NotOpen);
        }
        state.ops.push(MockOp::Read);
        state.rx_queue.pop_front().ok_or(TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn is_open(&self, handle: &MockHandle) -> bool {
        handle.open
    }

    /// Records the pause instead of sleeping.
    fn pause(&self, delay: Duration) {
        self.state.lock().unwrap().ops.push(MockOp::Pause(delay));
    }
}
