//! Device-facing protocol for motion-profile capable motor controllers.
//!
//! The core never talks to hardware directly; everything goes through
//! [`MotorController`]. Value types shared by both sides of that boundary
//! live in [`device`].
pub mod clock;
pub mod device;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use device::{
    ControlMode, MotionProfileOutput, MotionProfileStatus, Pidf, TrajectoryPoint,
};

/// Error type returned across the device boundary.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// A closed-loop motor controller that can execute streamed trajectory points.
///
/// Points are pushed into a host-side top buffer; `process_motion_profile_buffer`
/// moves them into the device's execution-ready (bottom) buffer.
pub trait MotorController {
    // Configuration
    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DeviceError>;
    fn control_mode(&mut self) -> Result<ControlMode, DeviceError>;
    fn select_profile_slot(&mut self, slot: u32) -> Result<(), DeviceError>;
    fn set_pidf(&mut self, gains: Pidf) -> Result<(), DeviceError>;
    fn set_allowable_closed_loop_err(&mut self, err: u32) -> Result<(), DeviceError>;
    fn change_motion_control_frame_period(&mut self, period_ms: u32)
    -> Result<(), DeviceError>;

    // Streaming
    fn push_motion_profile_trajectory(&mut self, point: &TrajectoryPoint)
    -> Result<(), DeviceError>;
    fn clear_motion_profile_trajectories(&mut self) -> Result<(), DeviceError>;
    fn clear_motion_profile_has_underrun(&mut self) -> Result<(), DeviceError>;
    fn process_motion_profile_buffer(&mut self) -> Result<(), DeviceError>;

    // Status and output
    fn motion_profile_status(&mut self) -> Result<MotionProfileStatus, DeviceError>;
    fn set_motion_profile_output(&mut self, value: MotionProfileOutput)
    -> Result<(), DeviceError>;
}
