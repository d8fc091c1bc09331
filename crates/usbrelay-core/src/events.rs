//! Event system for UI decoupling.
//!
//! Lets callers follow what the driver puts on the wire without coupling
//! to `tracing` or to the driver internals.

use std::fmt;

/// Connection state of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Events emitted by a relay board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Port opened and verified.
    Connected { port: String, baud_rate: u32 },
    /// Port closed and verified.
    Disconnected { port: String },
    /// A frame was fully written.
    FrameSent { relay: u8, on: bool, bytes: [u8; 4] },
    /// A frame write failed; the relay keeps its cached state.
    FrameFailed { relay: u8, message: String },
    /// Init handshake finished for `frames` frames.
    HandshakeComplete { frames: usize },
    /// Cached state changed for one relay.
    StateChanged { relay: u8, on: bool },
    /// Bytes read back from the board.
    BytesReceived { bytes: Vec<u8> },
}

/// Observer trait for receiving relay board events.
pub trait RelayObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &RelayEvent);
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn on_event(&self, event: &RelayEvent) {
        match event {
            RelayEvent::Connected { port, baud_rate } => {
                tracing::info!(port = %port, baud_rate, "Board connected");
            }
            RelayEvent::Disconnected { port } => {
                tracing::info!(port = %port, "Board disconnected");
            }
            RelayEvent::FrameSent { relay, on, bytes } => {
                tracing::trace!(relay, on, frame = %format!("{:02X?}", bytes), "Frame sent");
            }
            RelayEvent::FrameFailed { relay, message } => {
                tracing::warn!(relay, "Frame failed: {}", message);
            }
            RelayEvent::HandshakeComplete { frames } => {
                tracing::info!(frames, "Init handshake complete");
            }
            RelayEvent::StateChanged { relay, on } => {
                tracing::debug!(relay, on, "Relay state cached");
            }
            RelayEvent::BytesReceived { bytes } => {
                tracing::debug!(
                    len = bytes.len(),
                    data = %format!("{:02X?}", bytes),
                    "Bytes received"
                );
            }
        }
    }
}
