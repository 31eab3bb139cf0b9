#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Motion-profile streaming core (hardware-agnostic).
//!
//! All device interaction goes through `mpstream_traits::MotorController`.
//!
//! ## Architecture
//!
//! - **Profile**: raw point sequences and their pure conversion to native
//!   trajectory points (`profile` module)
//! - **Buffer mover**: fixed-rate background thread feeding the device's
//!   execution-ready buffer (`buffer_mover` module)
//! - **Streamer**: per-axis upload and Idle/WaitBuffered/Running state machine
//!   (`streamer` module)
//! - **Coordinator**: two streamers started, configured and stopped as one
//!   unit, with joint completion (`coordinator` module)
//! - **Runner**: paced control loop with runtime cap and shutdown (`runner`)
//!
//! The control cycle never fails: device errors inside `control()` are logged
//! and degrade the affected axis to Idle.

pub mod buffer_mover;
pub mod config;
pub mod conversions;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod gains;
pub mod hw_error;
pub mod mocks;
pub mod profile;
pub mod runner;
pub mod streamer;
pub mod util;

pub use config::{ArmPolicy, AxisCfg, CoordinatorCfg, GainPush, RunnerCfg, StreamCfg};
pub use coordinator::{AxisTargets, CoordinatorBuilder, DualAxisCoordinator, build_coordinator};
pub use device::{SharedDevice, shared};
pub use error::{AbortReason, BuildError, MpError, Result};
pub use gains::{DeviceConfig, GainSet, apply_config};
pub use profile::{AxisScale, Profile, ProfilePoint, convert_point};
pub use runner::{RunReport, run_maneuver};
pub use streamer::{AxisStreamer, StreamState};

/// Load a profile CSV and convert it into a `Profile`.
pub fn load_profile(path: &std::path::Path) -> Result<Profile> {
    use eyre::WrapErr;
    let rows = mpstream_config::load_profile_csv(path)?;
    Profile::from_rows(rows).wrap_err_with(|| format!("profile {}", path.display()))
}
