//! Transport layer: wire framing and the readiness-driven connection
//! driver.

pub mod driver;
pub mod frame;

pub use driver::{ConnectionDriver, Interest, Readiness};
pub use frame::{peek_frame_len, split_frame, FrameError, FrameHeader, FrameType};
