//! Two-axis coordinator.
//!
//! Owns a left and a right `AxisStreamer`, the per-axis gain sets and the
//! enabled flag. The outer loop calls `control()` every cycle and
//! `enable()`/`disable()` on lifecycle edges; `on_target()` is true once
//! both axes report completion.

use std::marker::PhantomData;
use std::time::Instant;

use eyre::WrapErr;
use mpstream_traits::{MotorController, Pidf};

use crate::config::{AxisCfg, CoordinatorCfg, GainPush, StreamCfg};
use crate::conversions::pidf_from;
use crate::device::{SharedDevice, lock};
use crate::error::{BuildError, Result};
use crate::gains::{DeviceConfig, GainSet, apply_config};
use crate::hw_error::device_report;
use crate::profile::Profile;
use crate::streamer::AxisStreamer;
use crate::util;

/// Per-axis target positions (raw profile units), taken from the last point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTargets {
    pub left: f64,
    pub right: f64,
}

pub struct DualAxisCoordinator<D: MotorController + Send + 'static> {
    left: AxisStreamer<D>,
    right: AxisStreamer<D>,
    left_gains: GainSet,
    right_gains: GainSet,
    // Gain versions last written to each device
    pushed: [Option<u64>; 2],
    targets: AxisTargets,
    cfg: CoordinatorCfg,
    gain_slot: u32,
    enabled: bool,
}

impl<D: MotorController + Send + 'static> core::fmt::Debug for DualAxisCoordinator<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DualAxisCoordinator")
            .field("enabled", &self.enabled)
            .field("targets", &self.targets)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}

impl<D: MotorController + Send + 'static> DualAxisCoordinator<D> {
    /// Start building a coordinator.
    pub fn builder() -> CoordinatorBuilder<D, Missing, Missing> {
        CoordinatorBuilder::default()
    }

    fn device_config(&self, gains: &GainSet) -> DeviceConfig {
        DeviceConfig {
            pidf: gains.pidf(),
            gain_slot: self.gain_slot,
            allowable_closed_loop_err: self.cfg.allowable_closed_loop_err,
        }
    }

    /// Configure both devices for profile execution and arm the streamers
    /// selected by the arm policy. No-op when already enabled.
    pub fn enable(&mut self) -> Result<()> {
        if self.enabled {
            return Ok(());
        }

        let left_cfg = self.device_config(&self.left_gains);
        let right_cfg = self.device_config(&self.right_gains);
        for (axis, cfg) in [(&self.left, left_cfg), (&self.right, right_cfg)] {
            let mut dev = lock(axis.device());
            apply_config(&mut *dev, &cfg)
                .map_err(device_report)
                .wrap_err_with(|| format!("{}: configure for motion profile", axis.label()))?;
            dev.set_motion_profile_output(axis.output())
                .map_err(device_report)
                .wrap_err_with(|| format!("{}: write output", axis.label()))?;
        }
        self.pushed = [
            Some(self.left_gains.version()),
            Some(self.right_gains.version()),
        ];

        if self.cfg.arm.arms_left() {
            self.left.start()?;
        }
        if self.cfg.arm.arms_right() {
            self.right.start()?;
        }

        self.enabled = true;
        tracing::info!(arm = ?self.cfg.arm, "coordinator enabled");
        Ok(())
    }

    /// Reset both streamers, write Disable to both devices and mark disabled.
    pub fn disable(&mut self) {
        self.left.reset();
        self.right.reset();
        write_output(&self.left);
        write_output(&self.right);
        if self.enabled {
            tracing::info!("coordinator disabled");
        }
        self.enabled = false;
    }

    /// One control cycle. Always advances both streamers; when enabled also
    /// writes outputs, re-applies configuration per the gain-push policy and
    /// writes outputs again in case the device reverted in between.
    pub fn control(&mut self) {
        let t0 = Instant::now();

        self.left.control();
        self.right.control();

        if self.enabled {
            write_output(&self.left);
            write_output(&self.right);
            self.push_config();
            write_output(&self.left);
            write_output(&self.right);
        }

        tracing::trace!(
            elapsed_us = util::micros(t0.elapsed()),
            left = ?self.left.state(),
            right = ?self.right.state(),
            "control cycle"
        );
    }

    fn push_config(&mut self) {
        let every_cycle = self.cfg.gain_push == GainPush::EveryCycle;
        let left_cfg = self.device_config(&self.left_gains);
        let right_cfg = self.device_config(&self.right_gains);
        let versions = [self.left_gains.version(), self.right_gains.version()];
        let axes = [(&self.left, left_cfg), (&self.right, right_cfg)];

        for (i, (axis, cfg)) in axes.into_iter().enumerate() {
            if !every_cycle && self.pushed[i] == Some(versions[i]) {
                continue;
            }
            match apply_config(&mut *lock(axis.device()), &cfg) {
                Ok(()) => {
                    if self.pushed[i] != Some(versions[i]) {
                        tracing::debug!(axis = axis.label(), version = versions[i], "gains pushed");
                    }
                    self.pushed[i] = Some(versions[i]);
                }
                Err(e) => {
                    tracing::warn!(axis = axis.label(), error = %e, "configuration push failed");
                }
            }
        }
    }

    /// True iff both axes report completion.
    pub fn on_target(&self) -> bool {
        self.left.is_complete() && self.right.is_complete()
    }

    pub fn set_gains(&mut self, left: Pidf, right: Pidf) {
        self.set_left_gains(left);
        self.set_right_gains(right);
    }

    pub fn set_left_gains(&mut self, gains: Pidf) {
        if self.left_gains.set(gains) {
            tracing::debug!(axis = "left", ?gains, "gains updated");
        }
    }

    pub fn set_right_gains(&mut self, gains: Pidf) {
        if self.right_gains.set(gains) {
            tracing::debug!(axis = "right", ?gains, "gains updated");
        }
    }

    pub fn left_gains(&self) -> &GainSet {
        &self.left_gains
    }

    pub fn right_gains(&self) -> &GainSet {
        &self.right_gains
    }

    pub fn targets(&self) -> AxisTargets {
        self.targets
    }

    /// Configured position deadband. Completion does not consult it.
    pub fn deadband(&self) -> f64 {
        self.cfg.position_deadband
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn left(&self) -> &AxisStreamer<D> {
        &self.left
    }

    pub fn right(&self) -> &AxisStreamer<D> {
        &self.right
    }
}

fn write_output<D: MotorController + Send + 'static>(axis: &AxisStreamer<D>) {
    let out = axis.output();
    if let Err(e) = lock(axis.device()).set_motion_profile_output(out) {
        tracing::warn!(axis = axis.label(), error = %e, output = ?out, "output write failed");
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

struct AxisParts<D> {
    device: SharedDevice<D>,
    profile: Profile,
}

/// Builder for `DualAxisCoordinator`. Validated on `build()`.
pub struct CoordinatorBuilder<D, L, R> {
    left: Option<AxisParts<D>>,
    right: Option<AxisParts<D>>,
    left_axis: AxisCfg,
    right_axis: AxisCfg,
    left_gains: Pidf,
    right_gains: Pidf,
    stream: StreamCfg,
    coordinator: CoordinatorCfg,
    _l: PhantomData<L>,
    _r: PhantomData<R>,
}

impl<D> Default for CoordinatorBuilder<D, Missing, Missing> {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            left_axis: AxisCfg::default(),
            right_axis: AxisCfg::default(),
            left_gains: Pidf::default(),
            right_gains: Pidf::default(),
            stream: StreamCfg::default(),
            coordinator: CoordinatorCfg::default(),
            _l: PhantomData,
            _r: PhantomData,
        }
    }
}

fn finite_gains(g: &Pidf) -> bool {
    [g.p, g.i, g.d, g.f].iter().all(|v| v.is_finite())
}

impl<D: MotorController + Send + 'static, L, R> CoordinatorBuilder<D, L, R> {
    /// Fallible build available in any type-state; reports missing axes.
    pub fn try_build(self) -> Result<DualAxisCoordinator<D>> {
        let left = self
            .left
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLeftAxis))?;
        let right = self
            .right
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRightAxis))?;

        if self.stream.buffer_period_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "buffer_period_ms must be >= 1",
            )));
        }
        if !self.coordinator.position_deadband.is_finite()
            || self.coordinator.position_deadband < 0.0
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "position_deadband must be finite and >= 0",
            )));
        }
        if !finite_gains(&self.left_gains) || !finite_gains(&self.right_gains) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "gains must be finite",
            )));
        }

        let targets = AxisTargets {
            left: left.profile.last_position(),
            right: right.profile.last_position(),
        };
        let left = AxisStreamer::new("left", left.device, left.profile, self.left_axis, self.stream)?;
        let right =
            AxisStreamer::new("right", right.device, right.profile, self.right_axis, self.stream)?;

        Ok(DualAxisCoordinator {
            left,
            right,
            left_gains: GainSet::new(self.left_gains),
            right_gains: GainSet::new(self.right_gains),
            pushed: [None, None],
            targets,
            cfg: self.coordinator,
            gain_slot: self.stream.gain_slot,
            enabled: false,
        })
    }

    pub fn with_left_axis(mut self, axis: AxisCfg) -> Self {
        self.left_axis = axis;
        self
    }
    pub fn with_right_axis(mut self, axis: AxisCfg) -> Self {
        self.right_axis = axis;
        self
    }
    pub fn with_gains(mut self, left: Pidf, right: Pidf) -> Self {
        self.left_gains = left;
        self.right_gains = right;
        self
    }
    pub fn with_stream(mut self, stream: StreamCfg) -> Self {
        self.stream = stream;
        self
    }
    pub fn with_coordinator(mut self, coordinator: CoordinatorCfg) -> Self {
        self.coordinator = coordinator;
        self
    }
    pub fn with_deadband(mut self, deadband: f64) -> Self {
        self.coordinator.position_deadband = deadband;
        self
    }
    /// Take stream, coordinator, axis and gain settings from a loaded config.
    pub fn with_config(self, cfg: &mpstream_config::Config) -> Self {
        self.with_stream(StreamCfg::from(&cfg.streaming))
            .with_coordinator(CoordinatorCfg::from(&cfg.coordinator))
            .with_left_axis(AxisCfg::from(&cfg.axes.left))
            .with_right_axis(AxisCfg::from(&cfg.axes.right))
            .with_gains(
                pidf_from(&cfg.axes.left.gains),
                pidf_from(&cfg.axes.right.gains),
            )
    }
}

// Setters that advance type-state
impl<D, R> CoordinatorBuilder<D, Missing, R> {
    pub fn with_left(self, device: SharedDevice<D>, profile: Profile) -> CoordinatorBuilder<D, Set, R> {
        CoordinatorBuilder {
            left: Some(AxisParts { device, profile }),
            right: self.right,
            left_axis: self.left_axis,
            right_axis: self.right_axis,
            left_gains: self.left_gains,
            right_gains: self.right_gains,
            stream: self.stream,
            coordinator: self.coordinator,
            _l: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<D, L> CoordinatorBuilder<D, L, Missing> {
    pub fn with_right(
        self,
        device: SharedDevice<D>,
        profile: Profile,
    ) -> CoordinatorBuilder<D, L, Set> {
        CoordinatorBuilder {
            left: self.left,
            right: Some(AxisParts { device, profile }),
            left_axis: self.left_axis,
            right_axis: self.right_axis,
            left_gains: self.left_gains,
            right_gains: self.right_gains,
            stream: self.stream,
            coordinator: self.coordinator,
            _l: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<D: MotorController + Send + 'static> CoordinatorBuilder<D, Set, Set> {
    /// Validate and build. Only available once both axes are set.
    pub fn build(self) -> Result<DualAxisCoordinator<D>> {
        self.try_build()
    }
}

/// Build a coordinator from the positional parts with default stream and
/// coordinator settings.
pub fn build_coordinator<D: MotorController + Send + 'static>(
    left_profile: Profile,
    right_profile: Profile,
    left_device: SharedDevice<D>,
    right_device: SharedDevice<D>,
    left_gains: Pidf,
    right_gains: Pidf,
    deadband: f64,
) -> Result<DualAxisCoordinator<D>> {
    DualAxisCoordinator::builder()
        .with_left(left_device, left_profile)
        .with_right(right_device, right_profile)
        .with_gains(left_gains, right_gains)
        .with_deadband(deadband)
        .build()
}
