//! Round-robin bounds check over read-back object positions.

use glam::Vec3;
use hanami_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Checks a fixed number of objects per frame against an x bound and
/// reports those that crossed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespawnSweep {
    pub checks_per_frame: u32,
    /// Objects with `x` beyond this are due for a respawn.
    pub bound: f32,
}

impl Default for RespawnSweep {
    fn default() -> Self {
        Self {
            checks_per_frame: 100,
            bound: 10.0,
        }
    }
}

impl RespawnSweep {
    /// Objects checked on `frame` that are past the bound.
    ///
    /// Frame `f` checks objects `(f * checks + i) % count` for
    /// `i in 0..checks`, so every object is visited once per
    /// `count / checks` frames.
    pub fn due(&self, frame: u64, positions: &[Vec3]) -> Vec<ObjectId> {
        let count = positions.len() as u64;
        if count == 0 {
            return Vec::new();
        }
        let checks = u64::from(self.checks_per_frame).min(count);
        let start = frame.wrapping_mul(u64::from(self.checks_per_frame));
        (0..checks)
            .map(|i| (start.wrapping_add(i) % count) as u32)
            .filter(|&id| positions[id as usize].x > self.bound)
            .map(ObjectId)
            .collect()
    }
}
