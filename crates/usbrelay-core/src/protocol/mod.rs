//! Protocol module - relay board wire format and dialects.

pub mod constants;
pub mod frame;
pub mod framing;

pub use constants::*;
pub use frame::{Frame, checksum, to_bits};
pub use framing::{Batched, ByteWise, FramingMode, FramingStrategy};
