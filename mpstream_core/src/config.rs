//! Runtime configuration for the streaming engine.
//!
//! These are the structs consumed by `AxisStreamer`, `DualAxisCoordinator`
//! and the maneuver runner. They are separate from the TOML-deserialized
//! config in `mpstream_config`.

use crate::profile::AxisScale;

/// Per-stream settings shared by both axes.
#[derive(Debug, Clone, Copy)]
pub struct StreamCfg {
    /// Buffer-mover period in ms; also written as the control-frame period.
    pub buffer_period_ms: u64,
    /// WaitBuffered leaves once the bottom buffer holds more than this.
    pub min_points_in_device: usize,
    /// Gain slot selected on enable and stamped on every point.
    pub gain_slot: u32,
}

impl Default for StreamCfg {
    fn default() -> Self {
        Self {
            buffer_period_ms: 5,
            min_points_in_device: 5,
            gain_slot: 1,
        }
    }
}

/// Per-axis point formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisCfg {
    pub scale: AxisScale,
    /// Mark every streamed point velocity-only.
    pub velocity_only: bool,
}

/// Which streamers `enable()` arms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArmPolicy {
    #[default]
    Both,
    LeftOnly,
    RightOnly,
}

impl ArmPolicy {
    pub fn arms_left(self) -> bool {
        matches!(self, Self::Both | Self::LeftOnly)
    }

    pub fn arms_right(self) -> bool {
        matches!(self, Self::Both | Self::RightOnly)
    }
}

/// When the coordinator re-pushes device configuration while enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GainPush {
    /// Mode, slot, gains and error tolerance every control cycle.
    #[default]
    EveryCycle,
    /// Only when an axis' gain set version differs from the last push.
    OnChange,
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorCfg {
    /// Closed-loop error tolerance written on enable (native units).
    pub allowable_closed_loop_err: u32,
    /// Position tolerance around each target. Not used for completion.
    pub position_deadband: f64,
    pub arm: ArmPolicy,
    pub gain_push: GainPush,
}

impl Default for CoordinatorCfg {
    fn default() -> Self {
        Self {
            allowable_closed_loop_err: 25,
            position_deadband: 0.0,
            arm: ArmPolicy::Both,
            gain_push: GainPush::EveryCycle,
        }
    }
}

/// Maneuver runner pacing and limits.
#[derive(Debug, Clone, Copy)]
pub struct RunnerCfg {
    pub control_period_ms: u64,
    /// Hard cap on a single maneuver.
    pub max_run_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            control_period_ms: 20,
            max_run_ms: 15_000,
        }
    }
}
