use mpstream_core::error::BuildError;
use mpstream_core::mocks::{Call, ScriptedController};
use mpstream_core::{
    ArmPolicy, CoordinatorCfg, DualAxisCoordinator, GainPush, Profile, SharedDevice, StreamState,
    build_coordinator, shared,
};
use mpstream_traits::{ControlMode, MotionProfileOutput, Pidf};
use rstest::rstest;

const LEFT_GAINS: Pidf = Pidf::new(1.0, 0.0, 10.0, 0.95);
const RIGHT_GAINS: Pidf = Pidf::new(1.1, 0.0, 11.0, 0.89);

type Dev = SharedDevice<ScriptedController>;

fn profile(last: f64) -> Profile {
    Profile::from_rows([(0.0, 0.0, 100.0), (last / 2.0, 50.0, 200.0), (last, 0.0, 100.0)]).unwrap()
}

fn coordinator(cfg: CoordinatorCfg) -> (Dev, Dev, DualAxisCoordinator<ScriptedController>) {
    let left = shared(ScriptedController::new());
    let right = shared(ScriptedController::new());
    let c = DualAxisCoordinator::builder()
        .with_left(left.clone(), profile(3.0))
        .with_right(right.clone(), profile(4.0))
        .with_gains(LEFT_GAINS, RIGHT_GAINS)
        .with_coordinator(cfg)
        .build()
        .unwrap();
    (left, right, c)
}

fn both(left: &Dev, right: &Dev, f: impl Fn(&mut ScriptedController)) {
    f(&mut left.lock().unwrap());
    f(&mut right.lock().unwrap());
}

/// Script both devices through buffering and the last point, then let the
/// streamers observe the hold.
fn run_to_completion(left: &Dev, right: &Dev, c: &mut DualAxisCoordinator<ScriptedController>) {
    c.control();
    both(left, right, |d| d.status.btm_buffer_cnt = 6);
    c.control();
    both(left, right, |d| {
        d.status.active_point_valid = true;
        d.status.active_point.is_last = true;
    });
    c.control();
    c.control();
}

#[test]
fn starts_disabled_with_targets_from_last_points() {
    let (_l, _r, c) = coordinator(CoordinatorCfg::default());
    assert!(!c.is_enabled());
    assert_eq!(c.targets().left, 3.0);
    assert_eq!(c.targets().right, 4.0);
    assert!(!c.on_target());
}

#[test]
fn deadband_is_exposed_but_not_used() {
    let left = shared(ScriptedController::new());
    let right = shared(ScriptedController::new());
    let c = build_coordinator(profile(1.0), profile(1.0), left, right, LEFT_GAINS, RIGHT_GAINS, 0.25)
        .unwrap();
    assert_eq!(c.deadband(), 0.25);
}

#[test]
fn enable_configures_then_streams() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    both(&left, &right, |d| {
        d.take_calls();
    });
    c.enable().unwrap();
    assert!(c.is_enabled());

    let r = right.lock().unwrap();
    assert_eq!(
        &r.calls[..5],
        &[
            Call::SetMode(ControlMode::MotionProfile),
            Call::SelectSlot(1),
            Call::SetPidf(RIGHT_GAINS),
            Call::SetAllowableErr(25),
            Call::SetOutput(MotionProfileOutput::Disable),
        ]
    );
    assert_eq!(r.calls[5], Call::ClearTrajectories);
    assert_eq!(r.pushed.len(), 3);
    drop(r);

    let l = left.lock().unwrap();
    assert!(l.calls.contains(&Call::SetPidf(LEFT_GAINS)));
    assert_eq!(l.pushed.len(), 3);
}

#[test]
fn enable_twice_is_same_as_once() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    c.enable().unwrap();
    both(&left, &right, |d| {
        d.take_calls();
    });
    c.enable().unwrap();
    assert!(left.lock().unwrap().calls.is_empty());
    assert!(right.lock().unwrap().calls.is_empty());
    assert_eq!(right.lock().unwrap().pushed.len(), 3);
}

#[test]
fn on_target_only_when_both_axes_complete() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    c.enable().unwrap();
    assert!(!c.on_target());

    c.control();
    both(&left, &right, |d| d.status.btm_buffer_cnt = 6);
    c.control();
    // Only the left axis reaches its last point
    {
        let mut l = left.lock().unwrap();
        l.status.active_point_valid = true;
        l.status.active_point.is_last = true;
    }
    c.control();
    c.control();
    assert!(c.left().is_complete());
    assert!(!c.right().is_complete());
    assert!(!c.on_target());

    {
        let mut r = right.lock().unwrap();
        r.status.active_point_valid = true;
        r.status.active_point.is_last = true;
    }
    c.control();
    c.control();
    assert!(c.on_target());
}

#[test]
fn synchronized_start_completes_together() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    c.enable().unwrap();
    run_to_completion(&left, &right, &mut c);
    assert!(c.on_target());
}

#[rstest]
#[case(ArmPolicy::LeftOnly, 3, 0)]
#[case(ArmPolicy::RightOnly, 0, 3)]
fn single_axis_arming_never_reaches_target(
    #[case] arm: ArmPolicy,
    #[case] left_points: usize,
    #[case] right_points: usize,
) {
    let cfg = CoordinatorCfg {
        arm,
        ..CoordinatorCfg::default()
    };
    let (left, right, mut c) = coordinator(cfg);
    c.enable().unwrap();
    assert_eq!(left.lock().unwrap().pushed.len(), left_points);
    assert_eq!(right.lock().unwrap().pushed.len(), right_points);

    run_to_completion(&left, &right, &mut c);
    // The unarmed axis stays idle and never completes
    assert!(!c.on_target());
    let idle = if arm == ArmPolicy::LeftOnly {
        c.right()
    } else {
        c.left()
    };
    assert_eq!(idle.state(), StreamState::Idle);
    assert!(!idle.is_complete());
}

#[test]
fn every_cycle_push_reapplies_config_and_double_writes_output() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    c.enable().unwrap();
    both(&left, &right, |d| {
        d.take_calls();
    });
    c.control();
    c.control();
    let r = right.lock().unwrap();
    assert_eq!(r.count(|x| *x == Call::SetPidf(RIGHT_GAINS)), 2);
    assert_eq!(r.count(|x| matches!(x, Call::SetMode(_))), 2);
    assert_eq!(r.count(|x| matches!(x, Call::SetOutput(_))), 4);
}

#[test]
fn on_change_push_only_after_gain_update() {
    let cfg = CoordinatorCfg {
        gain_push: GainPush::OnChange,
        ..CoordinatorCfg::default()
    };
    let (left, right, mut c) = coordinator(cfg);
    c.enable().unwrap();
    both(&left, &right, |d| {
        d.take_calls();
    });
    c.control();
    assert_eq!(left.lock().unwrap().count(|x| matches!(x, Call::SetPidf(_))), 0);

    let tuned = Pidf::new(2.0, 0.0, 20.0, 0.95);
    c.set_left_gains(tuned);
    assert_eq!(c.left_gains().version(), 2);
    c.control();
    c.control();
    assert_eq!(left.lock().unwrap().count(|x| *x == Call::SetPidf(tuned)), 1);
    assert_eq!(right.lock().unwrap().count(|x| matches!(x, Call::SetPidf(_))), 0);
    // Outputs are still written twice per cycle
    assert_eq!(
        right.lock().unwrap().count(|x| matches!(x, Call::SetOutput(_))),
        6
    );
}

#[test]
fn setting_identical_gains_keeps_version() {
    let (_l, _r, mut c) = coordinator(CoordinatorCfg::default());
    c.set_gains(LEFT_GAINS, RIGHT_GAINS);
    assert_eq!(c.left_gains().version(), 1);
    assert_eq!(c.right_gains().version(), 1);
    c.set_right_gains(LEFT_GAINS);
    assert_eq!(c.right_gains().version(), 2);
}

#[test]
fn control_while_disabled_writes_nothing() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    both(&left, &right, |d| {
        d.take_calls();
        d.mode = ControlMode::MotionProfile;
    });
    c.control();
    c.control();
    assert!(left.lock().unwrap().calls.is_empty());
    assert!(right.lock().unwrap().calls.is_empty());
}

#[test]
fn disable_mid_run_resets_both_axes() {
    let (left, right, mut c) = coordinator(CoordinatorCfg::default());
    c.enable().unwrap();
    c.control();
    both(&left, &right, |d| d.status.btm_buffer_cnt = 6);
    c.control();
    assert_eq!(c.right().state(), StreamState::Running);

    c.disable();
    assert!(!c.is_enabled());
    for axis in [c.left(), c.right()] {
        assert_eq!(axis.state(), StreamState::Idle);
        assert!(!axis.is_complete());
        assert!(!axis.pending_start());
        assert_eq!(axis.output(), MotionProfileOutput::Disable);
    }
    for dev in [&left, &right] {
        let d = dev.lock().unwrap();
        assert_eq!(d.status.btm_buffer_cnt, 0);
        assert_eq!(d.status.output, MotionProfileOutput::Disable);
    }

    // Enabling again re-streams from scratch
    c.enable().unwrap();
    assert_eq!(right.lock().unwrap().pushed.len(), 3);
}

#[test]
fn device_write_failure_during_control_is_swallowed() {
    let (_left, right, mut c) = coordinator(CoordinatorCfg::default());
    c.enable().unwrap();
    right.lock().unwrap().fail_writes = true;
    c.control();
    assert!(c.is_enabled());
    assert_eq!(c.left().state(), StreamState::WaitBuffered);
    assert_eq!(c.right().state(), StreamState::WaitBuffered);
}

#[test]
fn enable_fails_when_device_rejects_configuration() {
    let (left, _right, mut c) = coordinator(CoordinatorCfg::default());
    left.lock().unwrap().fail_writes = true;
    let err = c.enable().unwrap_err();
    assert!(format!("{err:#}").contains("left: configure for motion profile"));
    assert!(!c.is_enabled());
}

#[rstest]
fn builder_missing_left_yields_typed_build_error() {
    let right = shared(ScriptedController::new());
    let err = DualAxisCoordinator::builder()
        .with_right(right, profile(1.0))
        .try_build()
        .expect_err("should fail with MissingLeftAxis");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingLeftAxis) => {}
        other => panic!("expected MissingLeftAxis, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_right_yields_typed_build_error() {
    let left = shared(ScriptedController::new());
    let err = DualAxisCoordinator::builder()
        .with_left(left, profile(1.0))
        .try_build()
        .expect_err("should fail with MissingRightAxis");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingRightAxis)
    ));
}

#[rstest]
#[case(-0.1)]
#[case(f64::NAN)]
fn builder_rejects_bad_deadband(#[case] deadband: f64) {
    let err = DualAxisCoordinator::builder()
        .with_left(shared(ScriptedController::new()), profile(1.0))
        .with_right(shared(ScriptedController::new()), profile(1.0))
        .with_deadband(deadband)
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn builder_rejects_non_finite_gains() {
    let err = DualAxisCoordinator::builder()
        .with_left(shared(ScriptedController::new()), profile(1.0))
        .with_right(shared(ScriptedController::new()), profile(1.0))
        .with_gains(Pidf::new(f64::INFINITY, 0.0, 0.0, 0.0), RIGHT_GAINS)
        .build()
        .unwrap_err();
    assert!(format!("{err}").contains("gains must be finite"));
}
