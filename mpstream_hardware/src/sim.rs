//! Simulated motion-profile controller.
//!
//! Executes bottom-buffer points on its own clock with an ideal servo: the
//! reported position is always the active point's target. Time only advances
//! the profile while the controller is in motion-profile mode with output
//! `Enable`; `Hold` freezes on the active point and `Disable` stays neutral.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mpstream_traits::{
    Clock, ControlMode, DeviceError, MotionProfileOutput, MotionProfileStatus, MotorController,
    Pidf, TrajectoryPoint,
};

use crate::error::HwError;

/// Top buffer size of the modelled controller.
pub const DEFAULT_TOP_CAPACITY: usize = 2048;
/// Execution-ready buffer size of the modelled controller.
pub const DEFAULT_BOTTOM_CAPACITY: usize = 128;

pub struct SimController {
    clock: Arc<dyn Clock + Send + Sync>,
    mode: ControlMode,
    output: MotionProfileOutput,
    profile_slot: u32,
    gains: Pidf,
    allowable_err: u32,
    frame_period_ms: u32,
    top: VecDeque<TrajectoryPoint>,
    top_capacity: usize,
    bottom: VecDeque<TrajectoryPoint>,
    bottom_capacity: usize,
    active: Option<TrajectoryPoint>,
    // Time spent on the active point while enabled
    on_active: Duration,
    has_underrun: bool,
    is_underrun: bool,
    position: f64,
    sensor_zeroes: u32,
    last_tick: Instant,
    disconnected: bool,
    status_timeout: bool,
    config_writes: u64,
}

impl core::fmt::Debug for SimController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimController")
            .field("mode", &self.mode)
            .field("output", &self.output)
            .field("top", &self.top.len())
            .field("bottom", &self.bottom.len())
            .field("active_valid", &self.active.is_some())
            .field("position", &self.position)
            .finish()
    }
}

impl SimController {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last_tick = clock.now();
        Self {
            clock,
            mode: ControlMode::PercentOutput,
            output: MotionProfileOutput::Disable,
            profile_slot: 0,
            gains: Pidf::default(),
            allowable_err: 0,
            frame_period_ms: 10,
            top: VecDeque::new(),
            top_capacity: DEFAULT_TOP_CAPACITY,
            bottom: VecDeque::with_capacity(DEFAULT_BOTTOM_CAPACITY),
            bottom_capacity: DEFAULT_BOTTOM_CAPACITY,
            active: None,
            on_active: Duration::ZERO,
            has_underrun: false,
            is_underrun: false,
            position: 0.0,
            sensor_zeroes: 0,
            last_tick,
            disconnected: false,
            status_timeout: false,
            config_writes: 0,
        }
    }

    pub fn with_bottom_capacity(mut self, capacity: usize) -> Self {
        self.bottom_capacity = capacity.max(1);
        self
    }

    pub fn with_top_capacity(mut self, capacity: usize) -> Self {
        self.top_capacity = capacity.max(1);
        self
    }

    /// Simulate losing (or regaining) the bus; every call fails while set.
    pub fn set_disconnected(&mut self, disconnected: bool) {
        self.disconnected = disconnected;
    }

    /// Make status and mode reads time out while set; writes still succeed.
    pub fn set_status_timeout(&mut self, timeout: bool) {
        self.status_timeout = timeout;
    }

    /// Sensor position in native units.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// How many times a zero-position point has been activated.
    pub fn sensor_zero_count(&self) -> u32 {
        self.sensor_zeroes
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn output(&self) -> MotionProfileOutput {
        self.output
    }

    pub fn profile_slot(&self) -> u32 {
        self.profile_slot
    }

    pub fn gains(&self) -> Pidf {
        self.gains
    }

    pub fn allowable_closed_loop_err(&self) -> u32 {
        self.allowable_err
    }

    pub fn frame_period_ms(&self) -> u32 {
        self.frame_period_ms
    }

    /// Number of configuration writes (mode, slot, gains, error) received.
    pub fn config_writes(&self) -> u64 {
        self.config_writes
    }

    fn link(&self) -> Result<(), DeviceError> {
        if self.disconnected {
            return Err(Box::new(HwError::Disconnected));
        }
        Ok(())
    }

    fn status_frame(&self) -> Result<(), DeviceError> {
        self.link()?;
        if self.status_timeout {
            return Err(Box::new(HwError::Timeout));
        }
        Ok(())
    }

    fn activate_next(&mut self) -> bool {
        match self.bottom.pop_front() {
            Some(point) => {
                if point.zero_pos {
                    self.sensor_zeroes = self.sensor_zeroes.saturating_add(1);
                }
                self.position = point.position;
                self.active = Some(point);
                self.is_underrun = false;
                true
            }
            None => false,
        }
    }

    /// Run the execution clock up to now.
    fn advance(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        if self.mode != ControlMode::MotionProfile || self.output != MotionProfileOutput::Enable {
            return;
        }

        if self.active.is_none() {
            if !self.activate_next() {
                self.has_underrun = true;
                self.is_underrun = true;
                return;
            }
            self.on_active = Duration::ZERO;
            return;
        }

        self.on_active = self.on_active.saturating_add(dt);
        while let Some(active) = self.active {
            let dur = Duration::from_millis(u64::from(active.duration_ms));
            if active.is_last || self.on_active < dur {
                break;
            }
            if !self.activate_next() {
                if !self.has_underrun {
                    tracing::debug!(position = self.position, "sim bottom buffer underrun");
                }
                self.has_underrun = true;
                self.is_underrun = true;
                break;
            }
            self.on_active -= dur;
        }
    }
}

impl MotorController for SimController {
    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DeviceError> {
        self.link()?;
        self.advance();
        self.mode = mode;
        self.config_writes += 1;
        Ok(())
    }

    fn control_mode(&mut self) -> Result<ControlMode, DeviceError> {
        self.status_frame()?;
        Ok(self.mode)
    }

    fn select_profile_slot(&mut self, slot: u32) -> Result<(), DeviceError> {
        self.link()?;
        self.profile_slot = slot;
        self.config_writes += 1;
        Ok(())
    }

    fn set_pidf(&mut self, gains: Pidf) -> Result<(), DeviceError> {
        self.link()?;
        self.gains = gains;
        self.config_writes += 1;
        Ok(())
    }

    fn set_allowable_closed_loop_err(&mut self, err: u32) -> Result<(), DeviceError> {
        self.link()?;
        self.allowable_err = err;
        self.config_writes += 1;
        Ok(())
    }

    fn change_motion_control_frame_period(
        &mut self,
        period_ms: u32,
    ) -> Result<(), DeviceError> {
        self.link()?;
        self.frame_period_ms = period_ms.max(1);
        Ok(())
    }

    fn push_motion_profile_trajectory(
        &mut self,
        point: &TrajectoryPoint,
    ) -> Result<(), DeviceError> {
        self.link()?;
        if self.top.len() >= self.top_capacity {
            return Err(Box::new(HwError::TopBufferFull(self.top_capacity)));
        }
        self.top.push_back(*point);
        Ok(())
    }

    fn clear_motion_profile_trajectories(&mut self) -> Result<(), DeviceError> {
        self.link()?;
        self.top.clear();
        self.bottom.clear();
        self.active = None;
        self.on_active = Duration::ZERO;
        self.is_underrun = false;
        Ok(())
    }

    fn clear_motion_profile_has_underrun(&mut self) -> Result<(), DeviceError> {
        self.link()?;
        self.has_underrun = false;
        Ok(())
    }

    fn process_motion_profile_buffer(&mut self) -> Result<(), DeviceError> {
        self.link()?;
        self.advance();
        while self.bottom.len() < self.bottom_capacity {
            match self.top.pop_front() {
                Some(point) => self.bottom.push_back(point),
                None => break,
            }
        }
        Ok(())
    }

    fn motion_profile_status(&mut self) -> Result<MotionProfileStatus, DeviceError> {
        self.status_frame()?;
        self.advance();
        Ok(MotionProfileStatus {
            top_buffer_cnt: self.top.len(),
            top_buffer_rem: self.top_capacity.saturating_sub(self.top.len()),
            btm_buffer_cnt: self.bottom.len(),
            has_underrun: self.has_underrun,
            is_underrun: self.is_underrun,
            active_point_valid: self.active.is_some(),
            active_point: self.active.unwrap_or_default(),
            output: self.output,
        })
    }

    fn set_motion_profile_output(
        &mut self,
        value: MotionProfileOutput,
    ) -> Result<(), DeviceError> {
        self.link()?;
        self.advance();
        self.output = value;
        Ok(())
    }
}
