//! Solver configuration.
//!
//! Two layers: [`SolverSettings`] fixes the time base and backend when the
//! solver is created; [`StepConfig`] is handed to every `update` call and
//! carries the tunables a settings surface would expose.

use hanami_buffer::ComputeBackend;
use hanami_types::constants::{
    DEFAULT_DAMPING, DEFAULT_READBACK_PERIOD, DEFAULT_SEARCH_MARGIN, DEFAULT_SMOOTHING,
    DEFAULT_STEPS_PER_SECOND, MAX_FRAME_INTERVAL, MIN_FRAME_INTERVAL,
};
use hanami_types::{HanamiError, HanamiResult};
use serde::{Deserialize, Serialize};

/// Construction-time solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Fixed sub-step rate. One sub-step lasts `1 / steps_per_second` seconds.
    pub steps_per_second: u32,

    /// Lower clamp for the per-frame interval (seconds).
    pub min_interval: f64,

    /// Upper clamp for the per-frame interval (seconds). Bounds the number
    /// of sub-steps a single frame can take after a stall.
    pub max_interval: f64,

    /// Object positions are read back every this many frames.
    pub readback_period: u64,

    /// Where kernels execute.
    pub backend: ComputeBackend,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            steps_per_second: DEFAULT_STEPS_PER_SECOND,
            min_interval: MIN_FRAME_INTERVAL,
            max_interval: MAX_FRAME_INTERVAL,
            readback_period: DEFAULT_READBACK_PERIOD,
            backend: ComputeBackend::default(),
        }
    }
}

impl SolverSettings {
    /// Settings for reproducible tests: single-threaded kernels.
    pub fn sequential() -> Self {
        Self {
            backend: ComputeBackend::Sequential,
            ..Default::default()
        }
    }

    /// Sub-step duration in seconds.
    #[inline]
    pub fn step_duration(&self) -> f64 {
        1.0 / self.steps_per_second as f64
    }

    pub fn validate(&self) -> HanamiResult<()> {
        if self.steps_per_second == 0 {
            return Err(HanamiError::InvalidConfig(
                "steps_per_second must be positive".into(),
            ));
        }
        if !(self.min_interval > 0.0 && self.min_interval <= self.max_interval) {
            return Err(HanamiError::InvalidConfig(format!(
                "interval clamp [{}, {}] is empty or non-positive",
                self.min_interval, self.max_interval
            )));
        }
        if self.readback_period == 0 {
            return Err(HanamiError::InvalidConfig(
                "readback_period must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Per-frame step configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Global spring stiffness, multiplied into every spring's own factor.
    pub stiffness: f32,

    /// Contact friction. 0 keeps the full carried force on contact, 1 drops it.
    pub friction: f32,

    /// Carried-force damping per sub-step.
    pub damping: f32,

    /// Blend factor of the display position toward the true position.
    pub smoothing: f32,

    /// Inflation of the force vector used as the closest-point search radius.
    pub search_margin: f32,

    /// Height of the hard floor.
    pub ground_height: f32,

    /// When false, `update` returns without touching any state.
    pub run_simulation: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            stiffness: 0.25,
            friction: 0.5,
            damping: DEFAULT_DAMPING,
            smoothing: DEFAULT_SMOOTHING,
            search_margin: DEFAULT_SEARCH_MARGIN,
            ground_height: 0.0,
            run_simulation: true,
        }
    }
}

impl StepConfig {
    /// Accepted range of the global stiffness.
    pub const STIFFNESS_RANGE: (f32, f32) = (0.05, 0.5);

    /// A paused configuration.
    pub fn paused() -> Self {
        Self {
            run_simulation: false,
            ..Default::default()
        }
    }

    /// Contacts stop vertices dead.
    pub fn sticky() -> Self {
        Self {
            friction: 1.0,
            ..Default::default()
        }
    }

    /// Contacts keep the full carried force.
    pub fn frictionless() -> Self {
        Self {
            friction: 0.0,
            ..Default::default()
        }
    }

    /// Checks every tunable against its accepted range.
    pub fn validate(&self) -> HanamiResult<()> {
        let (lo, hi) = Self::STIFFNESS_RANGE;
        if !(lo..=hi).contains(&self.stiffness) {
            return Err(HanamiError::InvalidConfig(format!(
                "stiffness {} outside [{lo}, {hi}]",
                self.stiffness
            )));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(HanamiError::InvalidConfig(format!(
                "friction {} outside [0, 1]",
                self.friction
            )));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(HanamiError::InvalidConfig(format!(
                "damping {} outside [0, 1]",
                self.damping
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(HanamiError::InvalidConfig(format!(
                "smoothing {} outside [0, 1]",
                self.smoothing
            )));
        }
        if self.search_margin < 1.0 {
            return Err(HanamiError::InvalidConfig(format!(
                "search_margin {} must be at least 1",
                self.search_margin
            )));
        }
        Ok(())
    }
}
