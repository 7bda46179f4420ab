//! # hanami-physics
//!
//! Data-parallel Verlet mass-spring solver with collision against a
//! static spatial index.
//!
//! ## Key Types
//!
//! - [`VerletPhysics`]: Topology registration, bake, stepping and read-back
//! - [`StepConfig`]: Per-frame tunables passed to every `update`
//! - [`SolverSettings`]: Time base and compute backend
//! - [`BodyPlan`]: Reusable object topology (petal and cloth grids)
//! - [`ExternalForce`]: Pluggable per-vertex force contributor
//! - [`RespawnSweep`]: Round-robin bounds check over object positions

pub mod body_plan;
pub mod config;
pub mod forces;
pub mod influence;
mod kernels;
pub mod readback;
pub mod respawn;
pub mod solver;
pub mod topology;

pub use body_plan::BodyPlan;
pub use config::{SolverSettings, StepConfig};
pub use forces::{ExternalForce, Gravity, Wind};
pub use readback::{ObjectPositions, VertexSnapshot};
pub use respawn::RespawnSweep;
pub use solver::{BakeReport, StepReport, VerletPhysics};
