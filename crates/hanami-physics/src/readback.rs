//! Host-visible copies of solver state.
//!
//! Nothing here aliases solver buffers. Read-backs are copies taken at a
//! launch boundary.

use glam::Vec3;
use hanami_types::{HanamiError, HanamiResult};
use serde::{Deserialize, Serialize};

/// One representative position per object, in object order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPositions {
    /// Frame on which the gather ran.
    pub frame: u64,
    pub positions: Vec<Vec3>,
}

/// Full vertex state at a point in time.
///
/// Serialized with `bincode` for compact binary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexSnapshot {
    /// Number of `update` calls that ran.
    pub frame: u64,
    /// Simulation time in seconds.
    pub sim_time: f64,
    pub positions: Vec<Vec3>,
    /// Display positions after smoothing.
    pub smoothed: Vec<Vec3>,
    /// Carried force after the last sub-step.
    pub forces: Vec<Vec3>,
    pub fixed: Vec<bool>,
}

impl VertexSnapshot {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Axis-aligned bounds of the true positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> HanamiResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| HanamiError::Serialization(e.to_string()))
    }

    /// Deserializes from binary format.
    pub fn from_bytes(data: &[u8]) -> HanamiResult<Self> {
        bincode::deserialize(data).map_err(|e| {
            HanamiError::Serialization(format!("Snapshot deserialization failed: {e}"))
        })
    }
}
