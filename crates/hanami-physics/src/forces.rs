//! External force contributors.
//!
//! A contributor is a pure function of position and simulation time,
//! evaluated once per free vertex per sub-step. The returned vector is a
//! displacement per sub-step, the same unit as the spring forces.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A registered force contributor. All registered contributors are summed.
pub trait ExternalForce: Send + Sync {
    fn force(&self, position: Vec3, time: f32) -> Vec3;
}

impl<F> ExternalForce for F
where
    F: Fn(Vec3, f32) -> Vec3 + Send + Sync,
{
    #[inline]
    fn force(&self, position: Vec3, time: f32) -> Vec3 {
        self(position, time)
    }
}

/// Constant acceleration along a fixed direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gravity {
    pub acceleration: Vec3,
}

impl Gravity {
    /// Straight down with the given per-sub-step magnitude.
    pub fn down(magnitude: f32) -> Self {
        Self {
            acceleration: Vec3::new(0.0, -magnitude, 0.0),
        }
    }
}

impl ExternalForce for Gravity {
    #[inline]
    fn force(&self, _position: Vec3, _time: f32) -> Vec3 {
        self.acceleration
    }
}

/// Gusting wind: a base direction whose strength oscillates over time and
/// varies slowly across space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub direction: Vec3,
    pub strength: f32,
    /// Relative amplitude of the gusts, in `[0, 1]`.
    pub gust: f32,
    /// Gust frequency in radians per simulated second.
    pub frequency: f32,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            direction: Vec3::X,
            strength: 2.0e-6,
            gust: 0.5,
            frequency: 1.5,
        }
    }
}

impl ExternalForce for Wind {
    fn force(&self, position: Vec3, time: f32) -> Vec3 {
        let phase = time * self.frequency + position.y * 0.7 + position.z * 0.3;
        let scale = 1.0 + self.gust * phase.sin();
        self.direction.normalize_or_zero() * self.strength * scale
    }
}
