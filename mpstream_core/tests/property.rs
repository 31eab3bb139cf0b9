use mpstream_core::mocks::ScriptedController;
use mpstream_core::{AxisCfg, AxisScale, AxisStreamer, Profile, ProfilePoint, StreamCfg, shared};
use proptest::prelude::*;

fn rows() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-100.0f64..100.0, -500.0f64..500.0, 0.0f64..250.0), 1..200)
}

proptest! {
    #[test]
    fn conversion_flags_only_the_edges(rows in rows(), slot in 0u32..4) {
        let profile = Profile::from_rows(rows.clone()).unwrap();
        let pts = profile.to_trajectory(AxisScale::default(), slot, false);
        prop_assert_eq!(pts.len(), rows.len());
        let last = pts.len() - 1;
        for (i, p) in pts.iter().enumerate() {
            prop_assert_eq!(p.zero_pos, i == 0);
            prop_assert_eq!(p.is_last, i == last);
            prop_assert_eq!(p.profile_slot, slot);
        }
    }

    #[test]
    fn conversion_is_linear_in_scale(
        (pos, vel, dur) in (-100.0f64..100.0, -500.0f64..500.0, 0.0f64..250.0),
        ps in 0.1f64..10.0,
        vs in 0.1f64..500.0,
    ) {
        let scale = AxisScale { position_scale: ps, velocity_scale: vs };
        let tp = mpstream_core::convert_point(&ProfilePoint::new(pos, vel, dur), scale, 1, false);
        prop_assert!((tp.position - pos * ps).abs() <= 1e-9 * (1.0 + (pos * ps).abs()));
        prop_assert!((tp.velocity - vel * vs).abs() <= 1e-9 * (1.0 + (vel * vs).abs()));
        prop_assert!((f64::from(tp.duration_ms) - dur).abs() <= 0.5);
    }
}

proptest! {
    // Each case spawns a buffer-mover thread
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn start_uploads_exactly_the_profile(rows in rows()) {
        let dev = shared(ScriptedController::new());
        let profile = Profile::from_rows(rows.clone()).unwrap();
        let axis = AxisCfg { scale: AxisScale::IDENTITY, velocity_only: false };
        let mut s = AxisStreamer::new("prop", dev.clone(), profile, axis, StreamCfg::default()).unwrap();
        s.start().unwrap();

        let d = dev.lock().unwrap();
        prop_assert_eq!(d.pushed.len(), rows.len());
        prop_assert_eq!(d.status.top_buffer_cnt, rows.len());
        prop_assert!(d.pushed[0].zero_pos);
        prop_assert!(d.pushed[rows.len() - 1].is_last);
        let interior_flagged = d.pushed[1..d.pushed.len().saturating_sub(1).max(1)]
            .iter()
            .filter(|p| p.zero_pos || p.is_last)
            .count();
        prop_assert_eq!(interior_flagged, 0);
    }
}
