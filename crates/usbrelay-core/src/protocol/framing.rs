//! Frame batching dialects.
//!
//! Two board dialects share the frame layout but differ on the wire:
//!
//! - **Batched**: each frame goes out in one 4-byte write. The init
//!   handshake addresses relays `1..=relay_count`.
//! - **Byte-wise**: each frame goes out as four single-byte writes. The init
//!   handshake addresses relays `1..=relay_count + 1`, one index past the
//!   last relay. The extra frame is part of the dialect and is sent as is.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants::BYTE_WISE_INTER_BYTE_DELAY;
use super::frame::Frame;
use crate::error::RelayError;
use crate::transport::{SerialLink, SerialTransport};

/// How frames are built, put on the wire and which relays the init
/// handshake addresses.
pub trait FramingStrategy {
    /// Largest relay count this dialect can address.
    fn max_relay_count(&self) -> u8;

    /// Relay indices addressed by the init handshake.
    fn handshake_relays(&self, relay_count: u8) -> RangeInclusive<u8>;

    /// Transmit `frame`, then block for `delay`.
    fn send_frame<T: SerialTransport>(
        &self,
        link: &mut SerialLink<T>,
        frame: &Frame,
        delay: Duration,
    ) -> Result<(), RelayError>;

    fn build_frame(&self, relay: u8, on: bool) -> Frame {
        Frame::new(relay, on)
    }
}

/// One write per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Batched;

impl FramingStrategy for Batched {
    fn max_relay_count(&self) -> u8 {
        u8::MAX
    }

    fn handshake_relays(&self, relay_count: u8) -> RangeInclusive<u8> {
        1..=relay_count
    }

    fn send_frame<T: SerialTransport>(
        &self,
        link: &mut SerialLink<T>,
        frame: &Frame,
        delay: Duration,
    ) -> Result<(), RelayError> {
        let result = link.write_chunk(frame.relay(), frame.as_bytes());
        link.pace(delay);
        result
    }
}

/// One write per byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteWise;

impl FramingStrategy for ByteWise {
    fn max_relay_count(&self) -> u8 {
        // The handshake needs room for relay_count + 1.
        u8::MAX - 1
    }

    fn handshake_relays(&self, relay_count: u8) -> RangeInclusive<u8> {
        1..=relay_count.saturating_add(1)
    }

    fn send_frame<T: SerialTransport>(
        &self,
        link: &mut SerialLink<T>,
        frame: &Frame,
        delay: Duration,
    ) -> Result<(), RelayError> {
        let bytes = frame.as_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            // A failed byte still ends the frame with the full delay.
            if let Err(e) = link.write_chunk(frame.relay(), std::slice::from_ref(byte)) {
                link.pace(delay);
                return Err(e);
            }
            if i + 1 < bytes.len() {
                link.pace(BYTE_WISE_INTER_BYTE_DELAY);
            }
        }
        link.pace(delay);
        Ok(())
    }
}

/// Frame batching mode of a board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    #[default]
    Batched,
    ByteWise,
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingMode::Batched => write!(f, "batched"),
            FramingMode::ByteWise => write!(f, "byte-wise"),
        }
    }
}

impl FramingStrategy for FramingMode {
    fn max_relay_count(&self) -> u8 {
        match self {
            FramingMode::Batched => Batched.max_relay_count(),
            FramingMode::ByteWise => ByteWise.max_relay_count(),
        }
    }

    fn handshake_relays(&self, relay_count: u8) -> RangeInclusive<u8> {
        match self {
            FramingMode::Batched => Batched.handshake_relays(relay_count),
            FramingMode::ByteWise => ByteWise.handshake_relays(relay_count),
        }
    }

    fn send_frame<T: SerialTransport>(
        &self,
        link: &mut SerialLink<T>,
        frame: &Frame,
        delay: Duration,
    ) -> Result<(), RelayError> {
        match self {
            FramingMode::Batched => Batched.send_frame(link, frame, delay),
            FramingMode::ByteWise => ByteWise.send_frame(link, frame, delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockOp, MockTransport};

    fn open_link(mock: &MockTransport) -> SerialLink<MockTransport> {
        let mut link = SerialLink::new(mock.clone());
        link.open("DEV0", 9600).unwrap();
        link
    }

    #[test]
    fn test_batched_single_write() {
        let mock = MockTransport::new();
        let mut link = open_link(&mock);
        let frame = FramingMode::Batched.build_frame(2, true);
        FramingMode::Batched
            .send_frame(&mut link, &frame, Duration::ZERO)
            .unwrap();
        assert_eq!(mock.get_writes(), vec![vec![0xA0, 0x02, 0x01, 0xA3]]);
    }

    #[test]
    fn test_byte_wise_four_writes() {
        let mock = MockTransport::new();
        let mut link = open_link(&mock);
        let frame = FramingMode::ByteWise.build_frame(2, true);
        FramingMode::ByteWise
            .send_frame(&mut link, &frame, Duration::ZERO)
            .unwrap();
        assert_eq!(
            mock.get_writes(),
            vec![vec![0xA0], vec![0x02], vec![0x01], vec![0xA3]]
        );
        assert_eq!(link.tx_trace().snapshot(), vec![0xA3, 0x01, 0x02, 0xA0]);
    }

    #[test]
    fn test_byte_wise_stops_at_failed_byte() {
        let mock = MockTransport::new().fail_write_at(2);
        let mut link = open_link(&mock);
        let frame = ByteWise.build_frame(1, false);
        let result = ByteWise.send_frame(&mut link, &frame, Duration::ZERO);
        assert!(matches!(result, Err(RelayError::Transmit { relay: 1, .. })));
        assert_eq!(mock.get_writes(), vec![vec![0xA0]]);
    }

    #[test]
    fn test_batched_paces_after_failed_write() {
        let mock = MockTransport::new().fail_write_at(1);
        let mut link = open_link(&mock);
        let frame = Batched.build_frame(1, true);
        let delay = Duration::from_millis(20);
        assert!(Batched.send_frame(&mut link, &frame, delay).is_err());
        let ops = mock.ops();
        assert_eq!(ops.last(), Some(&MockOp::Pause(delay)));
        assert!(matches!(ops[ops.len() - 2], MockOp::Write(_)));
    }

    #[test]
    fn test_byte_wise_pacing() {
        let mock = MockTransport::new();
        let mut link = open_link(&mock);
        let frame = ByteWise.build_frame(3, false);
        let delay = Duration::from_millis(20);
        ByteWise.send_frame(&mut link, &frame, delay).unwrap();
        let pauses: Vec<Duration> = mock
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                MockOp::Pause(d) => Some(d),
                _ => None,
            })
            .collect();
        let gap = BYTE_WISE_INTER_BYTE_DELAY;
        assert_eq!(pauses, vec![gap, gap, gap, delay]);
    }

    #[test]
    fn test_byte_wise_paces_after_failed_byte() {
        let mock = MockTransport::new().fail_write_at(3);
        let mut link = open_link(&mock);
        let frame = ByteWise.build_frame(1, true);
        let delay = Duration::from_millis(20);
        assert!(ByteWise.send_frame(&mut link, &frame, delay).is_err());
        assert_eq!(mock.ops().last(), Some(&MockOp::Pause(delay)));
    }

    #[test]
    fn test_handshake_ranges() {
        assert_eq!(FramingMode::Batched.handshake_relays(8), 1..=8);
        assert_eq!(FramingMode::ByteWise.handshake_relays(8), 1..=9);
        assert_eq!(FramingMode::ByteWise.max_relay_count(), 254);
    }

    #[test]
    fn test_mode_serde_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            framing: FramingMode,
        }
        let text = toml::to_string(&Wrapper {
            framing: FramingMode::ByteWise,
        })
        .unwrap();
        assert_eq!(text.trim(), "framing = \"byte_wise\"");
        let parsed: Wrapper = toml::from_str("framing = \"batched\"").unwrap();
        assert_eq!(parsed.framing, FramingMode::Batched);
    }
}
