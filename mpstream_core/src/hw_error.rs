//! Maps `Box<dyn Error>` from the device boundary to typed `MpError`.
//!
//! `MotorController` methods return `DeviceError` so any backend can plug in;
//! this module converts those to our typed error enum, with an optional
//! feature-gated path for `mpstream_hardware::HwError` downcasting.

use mpstream_traits::DeviceError;

use crate::error::MpError;

/// Map a trait-boundary error to a typed `MpError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> MpError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<mpstream_hardware::error::HwError>() {
            return match hw {
                mpstream_hardware::error::HwError::Timeout => MpError::Timeout,
                other => MpError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        MpError::Timeout
    } else {
        MpError::Hardware(s)
    }
}

/// Wrap a device error into a report carrying the typed `MpError`.
pub fn device_report(e: DeviceError) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}
