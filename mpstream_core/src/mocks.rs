//! Test and helper mocks for mpstream_core

use mpstream_traits::{
    ControlMode, DeviceError, MotionProfileOutput, MotionProfileStatus, MotorController, Pidf,
    TrajectoryPoint,
};

/// Device calls recorded by `ScriptedController`, except buffer transfers
/// and status reads which only bump counters.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetMode(ControlMode),
    SelectSlot(u32),
    SetPidf(Pidf),
    SetAllowableErr(u32),
    FramePeriod(u32),
    Push,
    ClearTrajectories,
    ClearUnderrun,
    SetOutput(MotionProfileOutput),
}

/// A controller whose status is whatever the test says it is.
///
/// Pushed points are recorded and counted in the top buffer; nothing moves to
/// the bottom buffer or executes on its own. Tests script `status` and `mode`
/// directly.
#[derive(Debug, Default)]
pub struct ScriptedController {
    pub mode: ControlMode,
    pub status: MotionProfileStatus,
    pub pushed: Vec<TrajectoryPoint>,
    pub calls: Vec<Call>,
    pub processed: u64,
    /// Make every status and mode read fail.
    pub fail_reads: bool,
    /// Make every write fail.
    pub fail_writes: bool,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded calls.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Count recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    fn write(&mut self, call: Call) -> Result<(), DeviceError> {
        if self.fail_writes {
            return Err(Box::new(std::io::Error::other("scripted write failure")));
        }
        self.calls.push(call);
        Ok(())
    }

    fn read(&self) -> Result<(), DeviceError> {
        if self.fail_reads {
            return Err(Box::new(std::io::Error::other("scripted read failure")));
        }
        Ok(())
    }
}

impl MotorController for ScriptedController {
    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DeviceError> {
        self.write(Call::SetMode(mode))?;
        self.mode = mode;
        Ok(())
    }

    fn control_mode(&mut self) -> Result<ControlMode, DeviceError> {
        self.read()?;
        Ok(self.mode)
    }

    fn select_profile_slot(&mut self, slot: u32) -> Result<(), DeviceError> {
        self.write(Call::SelectSlot(slot))
    }

    fn set_pidf(&mut self, gains: Pidf) -> Result<(), DeviceError> {
        self.write(Call::SetPidf(gains))
    }

    fn set_allowable_closed_loop_err(&mut self, err: u32) -> Result<(), DeviceError> {
        self.write(Call::SetAllowableErr(err))
    }

    fn change_motion_control_frame_period(
        &mut self,
        period_ms: u32,
    ) -> Result<(), DeviceError> {
        self.write(Call::FramePeriod(period_ms))
    }

    fn push_motion_profile_trajectory(
        &mut self,
        point: &TrajectoryPoint,
    ) -> Result<(), DeviceError> {
        self.write(Call::Push)?;
        self.pushed.push(*point);
        self.status.top_buffer_cnt = self.pushed.len();
        Ok(())
    }

    fn clear_motion_profile_trajectories(&mut self) -> Result<(), DeviceError> {
        self.write(Call::ClearTrajectories)?;
        self.pushed.clear();
        self.status.top_buffer_cnt = 0;
        self.status.btm_buffer_cnt = 0;
        self.status.active_point_valid = false;
        Ok(())
    }

    fn clear_motion_profile_has_underrun(&mut self) -> Result<(), DeviceError> {
        self.write(Call::ClearUnderrun)?;
        self.status.has_underrun = false;
        Ok(())
    }

    fn process_motion_profile_buffer(&mut self) -> Result<(), DeviceError> {
        self.processed += 1;
        Ok(())
    }

    fn motion_profile_status(&mut self) -> Result<MotionProfileStatus, DeviceError> {
        self.read()?;
        Ok(self.status)
    }

    fn set_motion_profile_output(
        &mut self,
        value: MotionProfileOutput,
    ) -> Result<(), DeviceError> {
        self.write(Call::SetOutput(value))?;
        self.status.output = value;
        Ok(())
    }
}
