#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mpstream_core::{AxisScale, Profile, ProfilePoint};

#[derive(Debug, Arbitrary)]
struct Input {
    points: Vec<(f64, f64, f64)>,
    position_scale: f64,
    velocity_scale: f64,
    slot: u32,
    velocity_only: bool,
}

fuzz_target!(|input: Input| {
    let points: Vec<ProfilePoint> = input.points.into_iter().map(ProfilePoint::from).collect();
    let Ok(profile) = Profile::new(points) else {
        return;
    };
    let scale = AxisScale {
        position_scale: input.position_scale,
        velocity_scale: input.velocity_scale,
    };
    let traj = profile.to_trajectory(scale, input.slot, input.velocity_only);
    assert_eq!(traj.len(), profile.len());
    assert!(traj.first().is_some_and(|p| p.zero_pos));
    assert!(traj.last().is_some_and(|p| p.is_last));
});
