//! `From` implementations bridging `mpstream_config` types to `mpstream_core` types.

use mpstream_traits::Pidf;

use crate::config::{ArmPolicy, AxisCfg, CoordinatorCfg, GainPush, RunnerCfg, StreamCfg};
use crate::profile::{AxisScale, ProfilePoint};

// ── StreamCfg ────────────────────────────────────────────────────────────────

impl From<&mpstream_config::Streaming> for StreamCfg {
    fn from(c: &mpstream_config::Streaming) -> Self {
        Self {
            buffer_period_ms: c.buffer_period_ms,
            min_points_in_device: c.min_points_in_device,
            gain_slot: c.gain_slot,
        }
    }
}

// ── CoordinatorCfg ───────────────────────────────────────────────────────────

impl From<mpstream_config::ArmMode> for ArmPolicy {
    fn from(m: mpstream_config::ArmMode) -> Self {
        match m {
            mpstream_config::ArmMode::Both => Self::Both,
            mpstream_config::ArmMode::Left => Self::LeftOnly,
            mpstream_config::ArmMode::Right => Self::RightOnly,
        }
    }
}

impl From<mpstream_config::GainPush> for GainPush {
    fn from(p: mpstream_config::GainPush) -> Self {
        match p {
            mpstream_config::GainPush::EveryCycle => Self::EveryCycle,
            mpstream_config::GainPush::OnChange => Self::OnChange,
        }
    }
}

impl From<&mpstream_config::CoordinatorCfg> for CoordinatorCfg {
    fn from(c: &mpstream_config::CoordinatorCfg) -> Self {
        Self {
            allowable_closed_loop_err: c.allowable_closed_loop_err,
            position_deadband: c.position_deadband,
            arm: c.arm.into(),
            gain_push: c.gain_push.into(),
        }
    }
}

// ── Axes ─────────────────────────────────────────────────────────────────────

impl From<&mpstream_config::AxisCfg> for AxisCfg {
    fn from(c: &mpstream_config::AxisCfg) -> Self {
        Self {
            scale: AxisScale {
                position_scale: c.position_scale,
                velocity_scale: c.velocity_scale,
            },
            velocity_only: c.velocity_only,
        }
    }
}

/// Gains as written to the device, with the feed-forward resolved.
pub fn pidf_from(g: &mpstream_config::Gains) -> Pidf {
    Pidf::new(g.kp, g.ki, g.kd, g.feed_forward())
}

// ── RunnerCfg ────────────────────────────────────────────────────────────────

impl From<&mpstream_config::RunnerCfg> for RunnerCfg {
    fn from(c: &mpstream_config::RunnerCfg) -> Self {
        Self {
            control_period_ms: c.control_period_ms,
            max_run_ms: c.max_run_ms,
        }
    }
}

// ── Profile rows ─────────────────────────────────────────────────────────────

impl From<&mpstream_config::ProfileRow> for ProfilePoint {
    fn from(r: &mpstream_config::ProfileRow) -> Self {
        Self::new(r.position, r.velocity, r.duration_ms)
    }
}

impl From<mpstream_config::ProfileRow> for ProfilePoint {
    fn from(r: mpstream_config::ProfileRow) -> Self {
        Self::from(&r)
    }
}
