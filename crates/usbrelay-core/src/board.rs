//! Relay board driver.
//!
//! [`RelayBoard`] ties together a serial link, a framing dialect and the
//! host-side state cache.
//!
//! The board never reports its relay states. What [`RelayBoard::state`]
//! returns is a write-through cache: relay `i` changes only after a frame
//! for it was fully written. After a failed `set_state` the cache holds the
//! relays commanded before the failure plus the untouched previous values
//! of the rest.
//!
//! A board is driven through `&mut self`; sharing one across threads needs
//! an external lock.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::BoardConfig;
use crate::error::RelayError;
use crate::events::{ConnectionState, RelayEvent, RelayObserver, TracingObserver};
use crate::protocol::constants::{
    DEFAULT_INTER_COMMAND_DELAY_MS, OPERATIONAL_BAUD_RATE, STATE_OFF, STATE_ON,
};
use crate::protocol::frame::Frame;
use crate::protocol::framing::{FramingMode, FramingStrategy};
use crate::transport::{SerialLink, SerialTransport};

/// One relay board session over a serial transport.
pub struct RelayBoard<T: SerialTransport> {
    port: String,
    baud_rate: u32,
    relay_count: u8,
    delay_ms: u64,
    framing: FramingMode,
    link: SerialLink<T>,
    states: Vec<bool>,
    observer: Arc<dyn RelayObserver>,
}

impl<T: SerialTransport> RelayBoard<T> {
    /// Create a batched-framing board with `relay_count` relays.
    pub fn new(
        port: impl Into<String>,
        relay_count: u8,
        transport: T,
    ) -> Result<Self, RelayError> {
        Self::with_framing(port, relay_count, FramingMode::Batched, transport)
    }

    pub fn with_framing(
        port: impl Into<String>,
        relay_count: u8,
        framing: FramingMode,
        transport: T,
    ) -> Result<Self, RelayError> {
        if relay_count == 0 {
            return Err(RelayError::invalid("relay count must be at least 1"));
        }
        if relay_count > framing.max_relay_count() {
            return Err(RelayError::invalid(format!(
                "{framing} framing supports at most {} relays, got {relay_count}",
                framing.max_relay_count()
            )));
        }

        Ok(Self {
            port: port.into(),
            baud_rate: OPERATIONAL_BAUD_RATE,
            relay_count,
            delay_ms: DEFAULT_INTER_COMMAND_DELAY_MS,
            framing,
            link: SerialLink::new(transport),
            states: vec![false; relay_count as usize],
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn from_config(config: &BoardConfig, transport: T) -> Result<Self, RelayError> {
        let mut board =
            Self::with_framing(&config.port, config.relay_count, config.framing, transport)?;
        board.delay_ms = config.delay_ms;
        Ok(board)
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn emit(&self, event: RelayEvent) {
        self.observer.on_event(&event);
    }

    /// Open the stored port at the operational baud rate.
    ///
    /// A port that is already open is closed and reopened.
    #[instrument(skip(self), fields(port = %self.port))]
    pub fn connect(&mut self) -> Result<(), RelayError> {
        self.link.open(&self.port, self.baud_rate)?;
        self.emit(RelayEvent::Connected {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
        });
        Ok(())
    }

    #[instrument(skip(self), fields(port = %self.port))]
    pub fn close(&mut self) -> Result<(), RelayError> {
        let port = self
            .link
            .port()
            .map(str::to_string)
            .unwrap_or_else(|| self.port.clone());
        self.link.close()?;
        self.emit(RelayEvent::Disconnected { port });
        Ok(())
    }

    /// Send the init handshake: every relay in the dialect's handshake
    /// range is commanded off.
    ///
    /// Must be issued once after the board powers up; the board offers no
    /// way to tell whether it already happened. Stops at the first failed
    /// frame. The state cache is not touched.
    #[instrument(skip(self), fields(port = %self.port, framing = %self.framing))]
    pub fn init_board(&mut self) -> Result<(), RelayError> {
        self.ensure_connected()?;

        let relays = self.framing.handshake_relays(self.relay_count);
        let mut frames = 0;
        for relay in relays {
            self.send(relay, false)?;
            frames += 1;
        }

        self.emit(RelayEvent::HandshakeComplete { frames });
        Ok(())
    }

    /// Command every relay, relay 1 first.
    ///
    /// `states[i]` is the desired state of relay `i + 1`.
    #[instrument(skip(self, states), fields(port = %self.port))]
    pub fn set_state(&mut self, states: &[bool]) -> Result<(), RelayError> {
        if states.len() != self.relay_count as usize {
            return Err(RelayError::invalid(format!(
                "expected {} relay states, got {}",
                self.relay_count,
                states.len()
            )));
        }
        self.apply(states.iter().copied())
    }

    /// Command every relay from a bitmask, bit 0 driving relay 1.
    ///
    /// Relays beyond bit 63 are commanded off.
    #[instrument(skip(self), fields(port = %self.port))]
    pub fn set_state_mask(&mut self, mask: u64) -> Result<(), RelayError> {
        let desired = (0..u32::from(self.relay_count))
            .map(|bit| mask.checked_shr(bit).is_some_and(|m| m & 1 == 1));
        self.apply(desired)
    }

    /// Command every relay from raw levels, each `0` or `1`.
    ///
    /// Levels are validated before any frame is sent.
    pub fn set_state_levels(&mut self, levels: &[u8]) -> Result<(), RelayError> {
        let states = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| match level {
                STATE_OFF => Ok(false),
                STATE_ON => Ok(true),
                other => Err(RelayError::invalid(format!(
                    "relay {} level must be 0 or 1, got {other}",
                    i + 1
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.set_state(&states)
    }

    fn apply(&mut self, desired: impl Iterator<Item = bool>) -> Result<(), RelayError> {
        self.ensure_connected()?;

        for (i, on) in desired.enumerate() {
            let relay = (i + 1) as u8;
            self.send(relay, on)?;
            if self.states[i] != on {
                self.emit(RelayEvent::StateChanged { relay, on });
            }
            self.states[i] = on;
        }
        Ok(())
    }

    fn send(&mut self, relay: u8, on: bool) -> Result<(), RelayError> {
        let framing = self.framing;
        let frame = framing.build_frame(relay, on);
        let delay = Duration::from_millis(self.delay_ms);

        match framing.send_frame(&mut self.link, &frame, delay) {
            Ok(()) => {
                self.emit(RelayEvent::FrameSent {
                    relay,
                    on,
                    bytes: *frame.as_bytes(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(relay, error = %e, "Frame send failed");
                self.emit(RelayEvent::FrameFailed {
                    relay,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Encode the frame commanding `relay` (1-based) to `on`.
    pub fn encode_frame(&self, relay: u8, on: bool) -> Result<Frame, RelayError> {
        if relay == 0 || relay > self.relay_count {
            return Err(RelayError::invalid(format!(
                "relay {relay} out of range 1..={}",
                self.relay_count
            )));
        }
        Ok(self.framing.build_frame(relay, on))
    }

    /// Read up to `n` bytes back from the board, for diagnostics only.
    pub fn receive_bytes(&mut self, n: usize) -> Result<Vec<u8>, RelayError> {
        let bytes = self.link.receive_bytes(n)?;
        debug!(len = bytes.len(), "Received bytes");
        self.emit(RelayEvent::BytesReceived {
            bytes: bytes.clone(),
        });
        Ok(bytes)
    }

    fn ensure_connected(&self) -> Result<(), RelayError> {
        if self.link.is_connected() {
            Ok(())
        } else {
            Err(RelayError::NotConnected)
        }
    }

    /// Snapshot of the cached relay states, relay 1 first.
    pub fn state(&self) -> Vec<bool> {
        self.states.clone()
    }

    /// Recently transmitted bytes, most recent first.
    pub fn tx_trace(&self) -> Vec<u8> {
        self.link.tx_trace().snapshot()
    }

    /// Recently received bytes, most recent first.
    pub fn rx_trace(&self) -> Vec<u8> {
        self.link.rx_trace().snapshot()
    }

    pub fn connection_state(&self) -> ConnectionState {
        if self.link.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn relay_count(&self) -> u8 {
        self.relay_count
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    pub fn transport(&self) -> &T {
        self.link.transport()
    }

    /// Change the port used by the next `connect`.
    pub fn set_port(&mut self, port: impl Into<String>) {
        self.port = port.into();
        info!(port = %self.port, "Port changed");
    }

    /// Set the pacing delay applied after each frame.
    pub fn set_delay(&mut self, delay_ms: u64) {
        self.delay_ms = delay_ms;
    }

    /// Set the pacing delay from a float, which must be a whole,
    /// non-negative number of milliseconds.
    pub fn set_delay_millis_f64(&mut self, delay_ms: f64) -> Result<(), RelayError> {
        if !delay_ms.is_finite()
            || delay_ms < 0.0
            || delay_ms.fract() != 0.0
            || delay_ms >= u64::MAX as f64
        {
            return Err(RelayError::invalid(format!(
                "delay must be a whole number of milliseconds, got {delay_ms}"
            )));
        }
        self.delay_ms = delay_ms as u64;
        Ok(())
    }
}
