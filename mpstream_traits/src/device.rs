/// Output mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Open-loop percent output (manual driving).
    #[default]
    PercentOutput,
    /// Execute streamed trajectory points.
    MotionProfile,
    /// Mirror another controller's output.
    Follower,
}

/// Value written to the controller's output while in motion-profile mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionProfileOutput {
    /// Neutral output; buffered points are not executed.
    #[default]
    Disable,
    /// Execute buffered points in order.
    Enable,
    /// Keep servoing on the current point without advancing.
    Hold,
}

impl MotionProfileOutput {
    /// Raw set-value as understood by the device (0 disable, 1 enable, 2 hold).
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Disable => 0,
            Self::Enable => 1,
            Self::Hold => 2,
        }
    }
}

/// Proportional, integral, derivative and feed-forward gains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pidf {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
}

impl Pidf {
    pub const fn new(p: f64, i: f64, d: f64, f: f64) -> Self {
        Self { p, i, d, f }
    }
}

/// One device-native waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrajectoryPoint {
    /// Target position in native sensor units.
    pub position: f64,
    /// Target velocity in native units per 100 ms.
    pub velocity: f64,
    /// Time to spend on this point.
    pub duration_ms: u32,
    /// Gain slot the device should use while executing this point.
    pub profile_slot: u32,
    /// Skip the position servo and apply only velocity feed-forward.
    pub velocity_only: bool,
    /// Zero the sensor position when this point becomes active.
    pub zero_pos: bool,
    /// Final point of the profile; the device holds here once reached.
    pub is_last: bool,
}

/// Snapshot of the device's streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionProfileStatus {
    /// Points waiting in the host-side top buffer.
    pub top_buffer_cnt: usize,
    /// Free slots remaining in the top buffer.
    pub top_buffer_rem: usize,
    /// Points resident in the execution-ready buffer.
    pub btm_buffer_cnt: usize,
    /// Latched: the bottom buffer ran dry while executing.
    pub has_underrun: bool,
    /// Live: the bottom buffer is currently starved.
    pub is_underrun: bool,
    /// `active_point` holds a point the device is executing.
    pub active_point_valid: bool,
    pub active_point: TrajectoryPoint,
    /// Output currently applied by the device.
    pub output: MotionProfileOutput,
}
