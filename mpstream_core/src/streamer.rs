//! Per-axis trajectory streamer and execution state machine.
//!
//! `start()` uploads the whole profile into the device's top buffer and arms
//! a pending start; the buffer mover feeds the bottom buffer in the
//! background; `control()` reads device status once per cycle and walks
//! Idle → WaitBuffered → Running → Idle. The streamer never writes the
//! output itself: callers read `output()` and write it to the device.

use eyre::WrapErr;
use mpstream_traits::{ControlMode, MotionProfileOutput, MotionProfileStatus, MotorController};

use crate::buffer_mover::BufferMover;
use crate::config::{AxisCfg, StreamCfg};
use crate::device::{SharedDevice, lock};
use crate::error::Result;
use crate::hw_error::device_report;
use crate::profile::Profile;
use crate::util;

/// Execution state of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    /// Points uploaded; waiting for enough of them to reach the device.
    WaitBuffered,
    /// Output enabled; waiting for the device to reach the last point.
    Running,
}

pub struct AxisStreamer<D: MotorController + Send + 'static> {
    label: &'static str,
    device: SharedDevice<D>,
    profile: Profile,
    axis: AxisCfg,
    cfg: StreamCfg,
    state: StreamState,
    status: MotionProfileStatus,
    status_ok: bool,
    pending_start: bool,
    complete: bool,
    output: MotionProfileOutput,
    mover: BufferMover,
}

impl<D: MotorController + Send + 'static> core::fmt::Debug for AxisStreamer<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AxisStreamer")
            .field("axis", &self.label)
            .field("points", &self.profile.len())
            .field("state", &self.state)
            .field("pending_start", &self.pending_start)
            .field("complete", &self.complete)
            .field("output", &self.output)
            .finish()
    }
}

impl<D: MotorController + Send + 'static> AxisStreamer<D> {
    /// Bind `profile` to `device`, match the device's control-frame period to
    /// the buffer-mover period and start the mover.
    pub fn new(
        label: &'static str,
        device: SharedDevice<D>,
        profile: Profile,
        axis: AxisCfg,
        cfg: StreamCfg,
    ) -> Result<Self> {
        lock(&device)
            .change_motion_control_frame_period(util::frame_period_ms(cfg.buffer_period_ms))
            .map_err(device_report)
            .wrap_err_with(|| format!("{label}: set control frame period"))?;

        let mover = BufferMover::spawn(label, device.clone(), util::period(cfg.buffer_period_ms));

        Ok(Self {
            label,
            device,
            profile,
            axis,
            cfg,
            state: StreamState::Idle,
            status: MotionProfileStatus::default(),
            status_ok: true,
            pending_start: false,
            complete: false,
            output: MotionProfileOutput::Disable,
            mover,
        })
    }

    /// Upload the profile and arm a pending start.
    ///
    /// Clears a latched underrun and any previously buffered points first and
    /// drops the state machine back to Idle with output Disable, so
    /// restarting mid-stream waits for the new points to buffer again.
    pub fn start(&mut self) -> Result<()> {
        let points = self
            .profile
            .to_trajectory(self.axis.scale, self.cfg.gain_slot, self.axis.velocity_only);

        {
            let mut dev = lock(&self.device);
            let status = dev
                .motion_profile_status()
                .map_err(device_report)
                .wrap_err_with(|| format!("{}: read status", self.label))?;
            if status.has_underrun {
                tracing::warn!(axis = self.label, "clearing latched underrun");
                dev.clear_motion_profile_has_underrun()
                    .map_err(device_report)
                    .wrap_err_with(|| format!("{}: clear underrun", self.label))?;
            }
            dev.clear_motion_profile_trajectories()
                .map_err(device_report)
                .wrap_err_with(|| format!("{}: clear trajectories", self.label))?;
            for (idx, p) in points.iter().enumerate() {
                dev.push_motion_profile_trajectory(p)
                    .map_err(device_report)
                    .wrap_err_with(|| format!("{}: push point {idx}", self.label))?;
            }
        }

        if self.state != StreamState::Idle {
            tracing::debug!(axis = self.label, from = ?self.state, "restart; back to idle");
        }
        self.state = StreamState::Idle;
        self.output = MotionProfileOutput::Disable;
        self.pending_start = true;
        tracing::info!(axis = self.label, points = points.len(), "profile streamed");
        Ok(())
    }

    /// One control-cycle step. Never fails: a status read error or a device
    /// outside motion-profile mode drops the axis back to Idle with output
    /// Disable, keeping the completion flag and any pending start.
    pub fn control(&mut self) {
        let read = {
            let mut dev = lock(&self.device);
            dev.control_mode()
                .and_then(|mode| dev.motion_profile_status().map(|st| (mode, st)))
        };

        match read {
            Ok((mode, status)) => {
                if !self.status_ok {
                    tracing::info!(axis = self.label, "status reads recovered");
                    self.status_ok = true;
                }
                self.status = status;
                tracing::trace!(
                    axis = self.label,
                    top = status.top_buffer_cnt,
                    btm = status.btm_buffer_cnt,
                    active_valid = status.active_point_valid,
                    "status"
                );
                if mode == ControlMode::MotionProfile {
                    self.step();
                } else {
                    if self.state != StreamState::Idle {
                        tracing::debug!(
                            axis = self.label,
                            ?mode,
                            from = ?self.state,
                            "device left motion-profile mode; back to idle"
                        );
                    }
                    self.fall_back();
                }
            }
            Err(e) => {
                if self.status_ok {
                    tracing::warn!(axis = self.label, error = %e, "status read failed; back to idle");
                    self.status_ok = false;
                }
                self.fall_back();
            }
        }
    }

    // Overwrites a pending Hold, so a move finished right before a mode exit
    // is not reported complete.
    fn fall_back(&mut self) {
        self.state = StreamState::Idle;
        self.output = MotionProfileOutput::Disable;
    }

    fn step(&mut self) {
        match self.state {
            StreamState::Idle => {
                if self.output == MotionProfileOutput::Hold {
                    self.complete = true;
                    self.output = MotionProfileOutput::Disable;
                    tracing::info!(axis = self.label, "profile complete");
                }
                if self.pending_start {
                    self.pending_start = false;
                    self.complete = false;
                    self.output = MotionProfileOutput::Disable;
                    self.state = StreamState::WaitBuffered;
                    tracing::debug!(axis = self.label, "idle -> wait_buffered");
                }
            }
            StreamState::WaitBuffered => {
                if self.status.btm_buffer_cnt > self.cfg.min_points_in_device {
                    self.output = MotionProfileOutput::Enable;
                    self.state = StreamState::Running;
                    tracing::debug!(
                        axis = self.label,
                        buffered = self.status.btm_buffer_cnt,
                        "wait_buffered -> running"
                    );
                }
            }
            StreamState::Running => {
                if self.status.active_point_valid && self.status.active_point.is_last {
                    self.output = MotionProfileOutput::Hold;
                    self.state = StreamState::Idle;
                    tracing::debug!(axis = self.label, "running -> idle (holding last point)");
                }
            }
        }
    }

    /// Clear device buffers and return to Idle with output Disable.
    pub fn reset(&mut self) {
        if let Err(e) = lock(&self.device).clear_motion_profile_trajectories() {
            tracing::warn!(axis = self.label, error = %e, "clear trajectories failed during reset");
        }
        self.complete = false;
        self.state = StreamState::Idle;
        self.pending_start = false;
        self.output = MotionProfileOutput::Disable;
        tracing::debug!(axis = self.label, "reset");
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Output value the caller must write to the device this cycle.
    pub fn output(&self) -> MotionProfileOutput {
        self.output
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Last successfully read device status.
    pub fn status(&self) -> &MotionProfileStatus {
        &self.status
    }

    pub fn pending_start(&self) -> bool {
        self.pending_start
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn device(&self) -> &SharedDevice<D> {
        &self.device
    }

    /// Run `f` with the device locked.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut lock(&self.device))
    }

    /// Transfer passes made by this axis' buffer mover.
    pub fn mover_passes(&self) -> u64 {
        self.mover.passes()
    }
}
