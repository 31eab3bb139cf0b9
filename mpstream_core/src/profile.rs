//! Profiles and their conversion to device-native trajectory points.
//!
//! A `Profile` is an ordered, non-empty list of raw points (rotations, RPM,
//! milliseconds). Conversion scales each point by the axis factors and sets
//! the zero-position flag on the first point and the is-last flag on the
//! final one. Conversion is pure; the streamer calls it on every `start()`.

use mpstream_traits::TrajectoryPoint;

use crate::error::{MpError, Result};

/// One raw profile row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Rotations.
    pub position: f64,
    /// RPM.
    pub velocity: f64,
    /// Milliseconds.
    pub duration_ms: f64,
}

impl ProfilePoint {
    pub const fn new(position: f64, velocity: f64, duration_ms: f64) -> Self {
        Self {
            position,
            velocity,
            duration_ms,
        }
    }
}

impl From<(f64, f64, f64)> for ProfilePoint {
    fn from((position, velocity, duration_ms): (f64, f64, f64)) -> Self {
        Self::new(position, velocity, duration_ms)
    }
}

/// Raw → native scale factors for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    pub position_scale: f64,
    pub velocity_scale: f64,
}

impl Default for AxisScale {
    fn default() -> Self {
        Self {
            position_scale: 2.088,
            velocity_scale: 125.287,
        }
    }
}

impl AxisScale {
    pub const IDENTITY: Self = Self {
        position_scale: 1.0,
        velocity_scale: 1.0,
    };
}

/// Read-only point sequence for one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    points: Vec<ProfilePoint>,
}

impl Profile {
    /// Build a profile; fails with `MpError::EmptyProfile` when `points` is empty.
    pub fn new(points: Vec<ProfilePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(eyre::Report::new(MpError::EmptyProfile));
        }
        Ok(Self { points })
    }

    pub fn from_rows<I, P>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<ProfilePoint>,
    {
        Self::new(rows.into_iter().map(Into::into).collect())
    }

    pub fn points(&self) -> &[ProfilePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for the `len`/`is_empty` pair.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Raw position of the final point; the axis target.
    pub fn last_position(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.position)
    }

    /// Total planned duration in milliseconds.
    pub fn total_duration_ms(&self) -> f64 {
        self.points.iter().map(|p| p.duration_ms).sum()
    }

    /// Convert every point, flagging the first for zeroing and the last for hold.
    pub fn to_trajectory(
        &self,
        scale: AxisScale,
        profile_slot: u32,
        velocity_only: bool,
    ) -> Vec<TrajectoryPoint> {
        let last = self.points.len().saturating_sub(1);
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut tp = convert_point(p, scale, profile_slot, velocity_only);
                tp.zero_pos = i == 0;
                tp.is_last = i == last;
                tp
            })
            .collect()
    }
}

/// Round a raw duration to whole milliseconds in the device's range.
#[inline]
fn duration_to_ms(ms: f64) -> u32 {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    let r = ms.round();
    if r >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        r as u32
    }
}

/// Scale one raw point into a native trajectory point with both edge flags clear.
pub fn convert_point(
    p: &ProfilePoint,
    scale: AxisScale,
    profile_slot: u32,
    velocity_only: bool,
) -> TrajectoryPoint {
    TrajectoryPoint {
        position: p.position * scale.position_scale,
        velocity: p.velocity * scale.velocity_scale,
        duration_ms: duration_to_ms(p.duration_ms),
        profile_slot,
        velocity_only,
        zero_pos: false,
        is_last: false,
    }
}
