//! Versioned gain sets and the idempotent device configuration push.

use mpstream_traits::{ControlMode, DeviceError, MotorController, Pidf};

/// PIDF gains for one axis plus a version bumped on every change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GainSet {
    pidf: Pidf,
    version: u64,
}

impl GainSet {
    pub fn new(pidf: Pidf) -> Self {
        Self { pidf, version: 1 }
    }

    pub fn pidf(&self) -> Pidf {
        self.pidf
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the gains. Returns true when they actually changed.
    pub fn set(&mut self, pidf: Pidf) -> bool {
        if pidf == self.pidf {
            return false;
        }
        self.pidf = pidf;
        self.version = self.version.wrapping_add(1);
        true
    }
}

/// Everything written to a controller to make it execute profiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    pub pidf: Pidf,
    pub gain_slot: u32,
    pub allowable_closed_loop_err: u32,
}

/// Put `device` into motion-profile mode with the given slot, gains and
/// error tolerance. Safe to repeat; every write is absolute.
pub fn apply_config<D>(device: &mut D, cfg: &DeviceConfig) -> Result<(), DeviceError>
where
    D: MotorController + ?Sized,
{
    device.set_control_mode(ControlMode::MotionProfile)?;
    device.select_profile_slot(cfg.gain_slot)?;
    device.set_pidf(cfg.pidf)?;
    device.set_allowable_closed_loop_err(cfg.allowable_closed_loop_err)?;
    Ok(())
}
