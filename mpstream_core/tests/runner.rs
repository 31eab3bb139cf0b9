use std::sync::atomic::AtomicBool;

use mpstream_core::error::{AbortReason, MpError};
use mpstream_core::mocks::{Call, ScriptedController};
use mpstream_core::{DualAxisCoordinator, Profile, RunnerCfg, run_maneuver, shared};
use mpstream_traits::{ManualClock, MotionProfileOutput};
use rstest::rstest;

fn scripted_rig() -> (
    mpstream_core::SharedDevice<ScriptedController>,
    DualAxisCoordinator<ScriptedController>,
) {
    let left = shared(ScriptedController::new());
    let right = shared(ScriptedController::new());
    let profile = Profile::from_rows([(0.0, 0.0, 10.0), (1.0, 0.0, 10.0)]).unwrap();
    let c = DualAxisCoordinator::builder()
        .with_left(left.clone(), profile.clone())
        .with_right(right, profile)
        .build()
        .unwrap();
    (left, c)
}

#[rstest]
#[case(100, 20, 5)]
#[case(100, 30, 4)]
#[case(1, 20, 1)]
fn max_runtime_aborts_after_expected_cycles(
    #[case] max_run_ms: u64,
    #[case] control_period_ms: u64,
    #[case] expected_cycles: usize,
) {
    let (left, mut c) = scripted_rig();
    let clock = ManualClock::new();
    let cfg = RunnerCfg {
        control_period_ms,
        max_run_ms,
    };
    let err = run_maneuver(&mut c, &cfg, &clock, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MpError>(),
        Some(MpError::Abort(AbortReason::MaxRuntime))
    ));
    assert!(!c.is_enabled());

    // One mode write on enable plus one per control cycle
    let d = left.lock().unwrap();
    let mode_writes = d.count(|x| matches!(x, Call::SetMode(_)));
    assert_eq!(mode_writes, 1 + expected_cycles);
    assert_eq!(d.status.output, MotionProfileOutput::Disable);
}

#[test]
fn shutdown_before_first_cycle() {
    let (left, mut c) = scripted_rig();
    let stop = AtomicBool::new(true);
    let err = run_maneuver(&mut c, &RunnerCfg::default(), &ManualClock::new(), Some(&stop))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MpError>(),
        Some(MpError::Abort(AbortReason::Shutdown))
    ));
    // Enabled once, never cycled
    assert_eq!(left.lock().unwrap().count(|x| matches!(x, Call::SetMode(_))), 1);
}

#[test]
fn enable_failure_is_returned_and_leaves_disabled() {
    let (left, mut c) = scripted_rig();
    left.lock().unwrap().fail_writes = true;
    let err = run_maneuver(&mut c, &RunnerCfg::default(), &ManualClock::new(), None).unwrap_err();
    assert!(format!("{err:#}").contains("configure for motion profile"));
    assert!(!c.is_enabled());
}
