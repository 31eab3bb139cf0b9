//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mpstream_core::ArmPolicy;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective limits used for the current run (for JSON details).
pub static LAST_LIMITS: OnceLock<RunLimits> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct RunLimits {
    pub max_run_ms: u64,
    pub control_period_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "mpstream", version, about = "Dual-axis motion-profile streamer")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/mpstream.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty; results are printed as JSON too
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Which axes a run arms.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Arm {
    Both,
    Left,
    Right,
}

impl From<Arm> for ArmPolicy {
    fn from(a: Arm) -> Self {
        match a {
            Arm::Both => ArmPolicy::Both,
            Arm::Left => ArmPolicy::LeftOnly,
            Arm::Right => ArmPolicy::RightOnly,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a profile pair to the simulated axes and wait until both finish
    Run {
        /// Left axis profile CSV (overrides axes.left.profile)
        #[arg(long, value_name = "FILE")]
        left: Option<PathBuf>,
        /// Right axis profile CSV (overrides axes.right.profile)
        #[arg(long, value_name = "FILE")]
        right: Option<PathBuf>,
        /// Max run time in ms (takes precedence over config)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Override coordinator.arm
        #[arg(long, value_enum, value_name = "AXES")]
        arm: Option<Arm>,
        /// Print control loop stats
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Quick check that both controllers answer (sim ok)
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
