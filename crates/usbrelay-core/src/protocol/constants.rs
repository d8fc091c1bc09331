//! Wire-level constants for the relay board protocol.

use std::time::Duration;

/// First byte of every command frame.
pub const FRAME_HEADER: u8 = 0xA0;

/// Length of a command frame in bytes.
pub const FRAME_LEN: usize = 4;

/// State byte commanding a relay off.
pub const STATE_OFF: u8 = 0x00;
/// State byte commanding a relay on.
pub const STATE_ON: u8 = 0x01;

/// Baud rate for operational connections.
pub const OPERATIONAL_BAUD_RATE: u32 = 9600;

/// Baud rate used when probing candidate devices during a scan.
pub const PROBE_BAUD_RATE: u32 = 115_200;

/// Relay count of the common 8-channel board.
pub const DEFAULT_RELAY_COUNT: u8 = 8;

/// Default pacing delay applied after each transmitted frame.
pub const DEFAULT_INTER_COMMAND_DELAY_MS: u64 = 20;

/// Settle time between opening the port and checking it is open.
pub const OPEN_SETTLE_DELAY: Duration = Duration::from_millis(1);

/// Pacing between single-byte writes in the byte-wise dialect.
pub const BYTE_WISE_INTER_BYTE_DELAY: Duration = Duration::from_millis(1);

/// Per-byte read timeout.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

/// Capacity of each diagnostic trace buffer.
pub const TRACE_CAPACITY: usize = 8;

/// Exclusive upper bound on scanner candidate numbering.
pub const SCAN_UPPER_BOUND: u32 = 99;
