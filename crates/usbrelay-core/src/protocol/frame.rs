//! Command frame encoding.
//!
//! Every command is a fixed 4-byte frame:
//!
//! ```text
//! [0xA0, relay, state, checksum]
//! ```
//!
//! where `state` is `0x00` or `0x01` and `checksum` is the 8-bit wrapping sum
//! of the first three bytes.

use super::constants::{FRAME_HEADER, FRAME_LEN, STATE_OFF, STATE_ON};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
    #[error("Invalid header: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidHeader { expected: u8, actual: u8 },
    #[error("Invalid state byte: 0x{0:02X}")]
    InvalidState(u8),
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// 8-bit wrapping checksum over header, relay index and state byte.
pub const fn checksum(relay: u8, state: u8) -> u8 {
    FRAME_HEADER.wrapping_add(relay).wrapping_add(state)
}

/// Decompose a byte into its bits, least significant first.
pub fn to_bits(byte: u8) -> [bool; 8] {
    std::array::from_fn(|i| (byte >> i) & 1 == 1)
}

/// One encoded relay command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    pub const SIZE: usize = FRAME_LEN;

    /// Encode a frame for `relay` without range checking.
    ///
    /// Range validation against a board's relay count happens in the driver;
    /// the byte-wise handshake legitimately addresses one index past it.
    pub const fn new(relay: u8, on: bool) -> Self {
        let state = if on { STATE_ON } else { STATE_OFF };
        Self([FRAME_HEADER, relay, state, checksum(relay, state)])
    }

    pub fn relay(&self) -> u8 {
        self.0[1]
    }

    pub fn state(&self) -> bool {
        self.0[2] == STATE_ON
    }

    pub fn checksum(&self) -> u8 {
        self.0[3]
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Parse and verify a frame, e.g. one reassembled from a trace buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < Self::SIZE {
            return Err(FrameError::BufferTooSmall {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let [header, relay, state, sum] = [data[0], data[1], data[2], data[3]];
        if header != FRAME_HEADER {
            return Err(FrameError::InvalidHeader {
                expected: FRAME_HEADER,
                actual: header,
            });
        }
        if state != STATE_OFF && state != STATE_ON {
            return Err(FrameError::InvalidState(state));
        }
        let expected = checksum(relay, state);
        if sum != expected {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: sum,
            });
        }
        Ok(Self([header, relay, state, sum]))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
