//! usbrelay-core: command protocol engine for USB serial relay boards.
//!
//! This crate drives relay boards that speak a small binary protocol over a
//! serial link: one 4-byte frame per relay command.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Frame encoding, checksum, batched / byte-wise dialects
//! - **Transport**: Serial abstraction (serialport, mock) and the owning link
//! - **Trace**: Bounded tx/rx byte history for diagnostics
//! - **Board**: Driver with write-through relay state cache
//! - **Session**: Scoped connect/close guard
//! - **Scanner**: Probe-based device discovery
//! - **Events**: Observer pattern for UI decoupling
//! - **Config**: Serializable board configuration
//!
//! # Example
//!
//! ```no_run
//! use usbrelay_core::{RelayBoard, SerialPortTransport};
//!
//! let mut board = RelayBoard::new("/dev/ttyACM0", 8, SerialPortTransport::new())?;
//! board.with_session(|board| {
//!     board.init_board()?;
//!     board.set_state(&[true, true, true, true, false, false, false, false])?;
//!     board.set_state_mask(0xF0)
//! })?;
//! # Ok::<(), usbrelay_core::RelayError>(())
//! ```

pub mod board;
pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod scanner;
pub mod session;
pub mod trace;
pub mod transport;

// Re-exports for convenience
pub use board::RelayBoard;
pub use config::BoardConfig;
pub use error::RelayError;
pub use events::{ConnectionState, RelayEvent, RelayObserver, TracingObserver};
pub use protocol::{Frame, FramingMode, FramingStrategy};
pub use scanner::{candidate_ports, scan, scan_candidates};
pub use session::BoardSession;
pub use trace::TraceBuffer;
pub use transport::{MockTransport, SerialPortTransport, SerialTransport, TransportError};
