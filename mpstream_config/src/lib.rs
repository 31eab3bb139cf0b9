#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and motion-profile CSV loading.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Profile CSVs carry one row per trajectory point in raw profile units.
use std::path::PathBuf;

use serde::Deserialize;

/// Profile CSV schema.
///
/// Expected headers:
/// position,velocity,duration_ms
///
/// Example:
/// position,velocity,duration_ms
/// 0.0,0.0,10
/// 0.0012,7.14,10
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ProfileRow {
    /// Position in rotations.
    pub position: f64,
    /// Velocity in RPM.
    pub velocity: f64,
    /// Segment duration in milliseconds.
    pub duration_ms: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Streaming {
    /// Buffer-mover period; the control frame period is set to match.
    pub buffer_period_ms: u64,
    /// Bottom-buffer points required before output is enabled.
    pub min_points_in_device: usize,
    /// Gain slot selected on the controller and stamped on every point.
    pub gain_slot: u32,
}

impl Default for Streaming {
    fn default() -> Self {
        Self {
            buffer_period_ms: 5,
            min_points_in_device: 5,
            gain_slot: 1,
        }
    }
}

/// Which axes `enable` arms.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArmMode {
    #[default]
    Both,
    Left,
    Right,
}

/// When gain configuration is pushed to the controllers while enabled.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GainPush {
    #[default]
    EveryCycle,
    OnChange,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoordinatorCfg {
    /// Closed-loop error (native units) the controller treats as zero.
    pub allowable_closed_loop_err: u32,
    /// Position tolerance around each axis target (rotations). Informational.
    pub position_deadband: f64,
    pub arm: ArmMode,
    pub gain_push: GainPush,
}

impl Default for CoordinatorCfg {
    fn default() -> Self {
        Self {
            allowable_closed_loop_err: 25,
            position_deadband: 0.0,
            arm: ArmMode::Both,
            gain_push: GainPush::EveryCycle,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Explicit feed-forward; mutually exclusive with `max_velocity_rpm`.
    pub kf: Option<f64>,
    /// Derive feed-forward from the axis' top speed.
    pub max_velocity_rpm: Option<f64>,
    /// Encoder counts per revolution, required with `max_velocity_rpm`.
    pub encoder_codes_per_rev: Option<u32>,
}

impl Gains {
    /// Effective feed-forward: explicit `kf`, else derived from max velocity, else 0.
    pub fn feed_forward(&self) -> f64 {
        if let Some(kf) = self.kf {
            return kf;
        }
        match (self.max_velocity_rpm, self.encoder_codes_per_rev) {
            (Some(rpm), Some(cpr)) => feed_forward_for(rpm, cpr),
            _ => 0.0,
        }
    }
}

/// Feed-forward gain that maps `max_rpm` to full output (1023).
///
/// Native velocity is quadrature edges per 100 ms, i.e. `rpm * cpr * 4 / 600`.
pub fn feed_forward_for(max_rpm: f64, encoder_codes_per_rev: u32) -> f64 {
    let native = max_rpm * f64::from(encoder_codes_per_rev) * 4.0 / 600.0;
    if native <= 0.0 || !native.is_finite() {
        return 0.0;
    }
    1023.0 / native
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AxisCfg {
    /// Rotations → native position units.
    pub position_scale: f64,
    /// RPM → native velocity units.
    pub velocity_scale: f64,
    /// Stream every point as velocity-only (no position servo).
    pub velocity_only: bool,
    /// Optional profile CSV for this axis.
    pub profile: Option<PathBuf>,
    pub gains: Gains,
}

impl Default for AxisCfg {
    fn default() -> Self {
        Self {
            position_scale: 2.088,
            velocity_scale: 125.287,
            velocity_only: false,
            profile: None,
            gains: Gains::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Axes {
    pub left: AxisCfg,
    pub right: AxisCfg,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Control-cycle period of the maneuver loop.
    pub control_period_ms: u64,
    /// Hard cap on a single maneuver.
    pub max_run_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            control_period_ms: 20,
            max_run_ms: 15_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Execution-ready buffer size of the simulated controllers.
    pub bottom_buffer_capacity: usize,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            bottom_buffer_capacity: 128,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub streaming: Streaming,
    pub coordinator: CoordinatorCfg,
    pub axes: Axes,
    pub runner: RunnerCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Check a profile for the constraints the streamer relies on.
pub fn validate_profile(rows: &[ProfileRow]) -> eyre::Result<()> {
    if rows.is_empty() {
        eyre::bail!("profile must contain at least one point");
    }
    for (idx, r) in rows.iter().enumerate() {
        if !(r.position.is_finite() && r.velocity.is_finite() && r.duration_ms.is_finite()) {
            eyre::bail!("profile row {idx} has a non-finite value");
        }
        if r.duration_ms < 0.0 || r.duration_ms > f64::from(u32::MAX) {
            eyre::bail!("profile row {idx} duration_ms out of range: {}", r.duration_ms);
        }
    }
    Ok(())
}

pub fn load_profile_csv(path: &std::path::Path) -> eyre::Result<Vec<ProfileRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open profile CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["position", "velocity", "duration_ms"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "profile CSV must have headers 'position,velocity,duration_ms', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProfileRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    validate_profile(&rows)?;
    Ok(rows)
}

fn validate_axis(name: &str, axis: &AxisCfg) -> eyre::Result<()> {
    if !axis.position_scale.is_finite() || axis.position_scale == 0.0 {
        eyre::bail!("axes.{name}.position_scale must be finite and non-zero");
    }
    if !axis.velocity_scale.is_finite() {
        eyre::bail!("axes.{name}.velocity_scale must be finite");
    }
    let g = &axis.gains;
    for (key, v) in [("kp", g.kp), ("ki", g.ki), ("kd", g.kd)] {
        if !v.is_finite() || v < 0.0 {
            eyre::bail!("axes.{name}.gains.{key} must be finite and >= 0");
        }
    }
    if let Some(kf) = g.kf {
        if g.max_velocity_rpm.is_some() {
            eyre::bail!("axes.{name}.gains: set either kf or max_velocity_rpm, not both");
        }
        if !kf.is_finite() || kf < 0.0 {
            eyre::bail!("axes.{name}.gains.kf must be finite and >= 0");
        }
    }
    if let Some(rpm) = g.max_velocity_rpm {
        if !(rpm.is_finite() && rpm > 0.0) {
            eyre::bail!("axes.{name}.gains.max_velocity_rpm must be > 0");
        }
        match g.encoder_codes_per_rev {
            Some(cpr) if cpr > 0 => {}
            _ => eyre::bail!(
                "axes.{name}.gains.encoder_codes_per_rev must be >= 1 when max_velocity_rpm is set"
            ),
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Streaming
        if self.streaming.buffer_period_ms == 0 || self.streaming.buffer_period_ms > 100 {
            eyre::bail!("streaming.buffer_period_ms must be in [1, 100]");
        }
        if self.streaming.gain_slot > 3 {
            eyre::bail!("streaming.gain_slot must be in [0, 3]");
        }

        // Coordinator
        if !self.coordinator.position_deadband.is_finite()
            || self.coordinator.position_deadband < 0.0
        {
            eyre::bail!("coordinator.position_deadband must be finite and >= 0");
        }

        // Axes
        validate_axis("left", &self.axes.left)?;
        validate_axis("right", &self.axes.right)?;

        // Runner
        if self.runner.control_period_ms == 0 {
            eyre::bail!("runner.control_period_ms must be >= 1");
        }
        if self.runner.max_run_ms == 0 {
            eyre::bail!("runner.max_run_ms must be >= 1");
        }
        if self.runner.max_run_ms > 10 * 60 * 1000 {
            eyre::bail!("runner.max_run_ms is unreasonably large (>10min)");
        }

        // Sim: the streamer waits for more than min_points_in_device resident points
        if self.sim.bottom_buffer_capacity <= self.streaming.min_points_in_device {
            eyre::bail!("sim.bottom_buffer_capacity must exceed streaming.min_points_in_device");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        Ok(())
    }
}
