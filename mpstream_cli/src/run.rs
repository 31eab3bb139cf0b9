//! `run` and `self-check` subcommands against simulated controllers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::{WrapErr, eyre};
use mpstream_config::Config;
use mpstream_core::error::AbortReason;
use mpstream_core::hw_error::device_report;
use mpstream_core::{
    CoordinatorCfg, DualAxisCoordinator, RunReport, RunnerCfg, SharedDevice, load_profile, shared,
};
use mpstream_hardware::SimController;
use mpstream_traits::{Clock, MonotonicClock, MotorController};

use crate::cli::{Arm, LAST_LIMITS, RunLimits};

pub struct RunArgs {
    pub left: Option<PathBuf>,
    pub right: Option<PathBuf>,
    pub max_run_ms: Option<u64>,
    pub arm: Option<Arm>,
    pub stats: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AxisOutcome {
    /// Final profile position in rotations.
    pub target: f64,
    /// Simulated sensor position converted back to rotations.
    pub position: f64,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub left: AxisOutcome,
    pub right: AxisOutcome,
}

pub fn abort_reason_name(r: &AbortReason) -> &'static str {
    match r {
        AbortReason::MaxRuntime => "MaxRuntime",
        AbortReason::Shutdown => "Shutdown",
    }
}

/// Relative profile paths in the config resolve against the config file's directory.
fn resolve_profile(
    flag: Option<PathBuf>,
    from_config: Option<&Path>,
    config_dir: &Path,
    axis: &str,
) -> eyre::Result<PathBuf> {
    if let Some(p) = flag {
        return Ok(p);
    }
    match from_config {
        Some(p) if p.is_absolute() => Ok(p.to_path_buf()),
        Some(p) => Ok(config_dir.join(p)),
        None => Err(eyre!(
            "no {axis} profile: pass --{axis} or set axes.{axis}.profile"
        )),
    }
}

fn sim_device(clock: &Arc<dyn Clock + Send + Sync>, cfg: &Config) -> SharedDevice<SimController> {
    shared(SimController::new(Arc::clone(clock)).with_bottom_capacity(cfg.sim.bottom_buffer_capacity))
}

fn axis_outcome(device: &SharedDevice<SimController>, target: f64, position_scale: f64) -> AxisOutcome {
    let native = device
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .position();
    AxisOutcome {
        target,
        position: native / position_scale,
    }
}

pub fn run_profiles(
    cfg: &Config,
    config_dir: &Path,
    args: RunArgs,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<RunOutcome> {
    let left_path = resolve_profile(
        args.left,
        cfg.axes.left.profile.as_deref(),
        config_dir,
        "left",
    )?;
    let right_path = resolve_profile(
        args.right,
        cfg.axes.right.profile.as_deref(),
        config_dir,
        "right",
    )?;
    let left_profile = load_profile(&left_path)?;
    let right_profile = load_profile(&right_path)?;
    tracing::info!(
        left = %left_path.display(),
        right = %right_path.display(),
        left_points = left_profile.len(),
        right_points = right_profile.len(),
        "profiles loaded"
    );

    let mut coordinator_cfg = CoordinatorCfg::from(&cfg.coordinator);
    if let Some(arm) = args.arm {
        coordinator_cfg.arm = arm.into();
    }
    let mut runner_cfg = RunnerCfg::from(&cfg.runner);
    if let Some(ms) = args.max_run_ms {
        runner_cfg.max_run_ms = ms;
    }
    let _ = LAST_LIMITS.set(RunLimits {
        max_run_ms: runner_cfg.max_run_ms,
        control_period_ms: runner_cfg.control_period_ms,
    });

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let left_dev = sim_device(&clock, cfg);
    let right_dev = sim_device(&clock, cfg);

    let mut coordinator = DualAxisCoordinator::<SimController>::builder()
        .with_config(cfg)
        .with_coordinator(coordinator_cfg)
        .with_left(Arc::clone(&left_dev), left_profile)
        .with_right(Arc::clone(&right_dev), right_profile)
        .try_build()
        .wrap_err("failed to build coordinator")?;

    let report = mpstream_core::run_maneuver(
        &mut coordinator,
        &runner_cfg,
        clock.as_ref(),
        Some(shutdown.as_ref()),
    )?;

    if args.stats {
        print_stats(&report, runner_cfg.control_period_ms);
    }

    let targets = coordinator.targets();
    Ok(RunOutcome {
        left: axis_outcome(&left_dev, targets.left, cfg.axes.left.position_scale),
        right: axis_outcome(&right_dev, targets.right, cfg.axes.right.position_scale),
        report,
    })
}

/// Confirm both controllers answer a mode and status read.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    for label in ["left", "right"] {
        let device = sim_device(&clock, cfg);
        let mut dev = device
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mode = dev
            .control_mode()
            .map_err(device_report)
            .wrap_err_with(|| format!("{label} controller: read control mode"))?;
        let status = dev
            .motion_profile_status()
            .map_err(device_report)
            .wrap_err_with(|| format!("{label} controller: read motion profile status"))?;
        tracing::debug!(axis = label, ?mode, ?status, "controller answered");
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn print_stats(report: &RunReport, control_period_ms: u64) {
    let latencies = &report.latencies_us;
    let min = latencies.iter().min().copied().unwrap_or(0);
    let max = latencies.iter().max().copied().unwrap_or(0);
    let avg = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };
    let stdev = if latencies.len() > 1 {
        let var = latencies
            .iter()
            .map(|&x| (x as f64 - avg).powi(2))
            .sum::<f64>()
            / (latencies.len() as f64 - 1.0);
        var.sqrt()
    } else {
        0.0
    };
    eprintln!("\n--- Maneuver Stats ---");
    eprintln!("Cycles: {}", report.cycles);
    eprintln!("Period (ms): {control_period_ms}");
    eprintln!("Control latency min/avg/max/stdev (us): {min} / {avg:.1} / {max} / {stdev:.1}");
    eprintln!("Missed deadlines (> period): {}", report.deadline_misses);
    eprintln!("----------------------\n");
}
