//! Controller backends for the motion-profile streamer.
//!
//! Only a simulated backend ships today; it models the two-level buffer,
//! the device execution clock and underrun latching closely enough to drive
//! the core end to end.
pub mod error;
pub mod sim;

pub use sim::SimController;
