//! Maneuver runner: drives a coordinator at a fixed control period until
//! both axes are on target, the runtime cap is hit or shutdown is requested.
//! The coordinator is always disabled before returning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mpstream_traits::{Clock, MotorController};

use crate::config::RunnerCfg;
use crate::coordinator::DualAxisCoordinator;
use crate::error::{AbortReason, MpError, Result};
use crate::util;

/// Outcome of a completed maneuver.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Control cycles executed.
    pub cycles: u64,
    /// Wall time from enable to on-target.
    pub elapsed: Duration,
    /// Per-cycle `control()` latency in microseconds.
    pub latencies_us: Vec<u64>,
    /// Cycles whose work overran the control period.
    pub deadline_misses: u64,
}

#[inline]
fn should_stop(shutdown: Option<&AtomicBool>) -> bool {
    shutdown.is_some_and(|f| f.load(Ordering::Relaxed))
}

fn abort<D: MotorController + Send + 'static>(
    coordinator: &mut DualAxisCoordinator<D>,
    reason: AbortReason,
) -> eyre::Report {
    coordinator.disable();
    tracing::error!(reason = %reason, "maneuver aborted");
    eyre::Report::new(MpError::Abort(reason))
}

/// Enable `coordinator` and run control cycles until `on_target()`.
///
/// Aborts with `MpError::Abort(MaxRuntime)` once `cfg.max_run_ms` elapses and
/// with `MpError::Abort(Shutdown)` when `shutdown` is set.
pub fn run_maneuver<D, C>(
    coordinator: &mut DualAxisCoordinator<D>,
    cfg: &RunnerCfg,
    clock: &C,
    shutdown: Option<&AtomicBool>,
) -> Result<RunReport>
where
    D: MotorController + Send + 'static,
    C: Clock + ?Sized,
{
    let period = util::period(cfg.control_period_ms);
    let max_run = Duration::from_millis(cfg.max_run_ms);

    if let Err(e) = coordinator.enable() {
        coordinator.disable();
        return Err(e);
    }
    tracing::info!(
        control_period_ms = cfg.control_period_ms,
        max_run_ms = cfg.max_run_ms,
        "maneuver start"
    );

    let epoch = clock.now();
    let mut report = RunReport::default();
    loop {
        if should_stop(shutdown) {
            return Err(abort(coordinator, AbortReason::Shutdown));
        }
        if clock.now().saturating_duration_since(epoch) >= max_run {
            return Err(abort(coordinator, AbortReason::MaxRuntime));
        }

        let cycle_start = clock.now();
        coordinator.control();
        let spent = clock.now().saturating_duration_since(cycle_start);
        report.cycles += 1;
        report.latencies_us.push(util::micros(spent));

        if coordinator.on_target() {
            report.elapsed = clock.now().saturating_duration_since(epoch);
            coordinator.disable();
            tracing::info!(
                cycles = report.cycles,
                elapsed_ms = util::millis(report.elapsed),
                "maneuver on target"
            );
            return Ok(report);
        }

        if spent < period {
            clock.sleep(period - spent);
        } else {
            report.deadline_misses += 1;
        }
    }
}
