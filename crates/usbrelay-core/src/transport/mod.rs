//! Transport layer module.

pub mod link;
pub mod mock;
pub mod serial;
pub mod traits;

pub use link::SerialLink;
pub use mock::{MockHandle, MockOp, MockTransport};
pub use serial::{SerialHandle, SerialPortTransport};
pub use traits::{SerialTransport, TransportError};
