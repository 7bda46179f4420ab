//! Simulation constants and defaults.

/// Fixed sub-step rate of the particle solver (steps per simulated second).
pub const DEFAULT_STEPS_PER_SECOND: u32 = 360;

/// Smallest wall-clock interval a single `update` call will account for (seconds).
pub const MIN_FRAME_INTERVAL: f64 = 0.0001;

/// Largest wall-clock interval a single `update` call will account for (seconds).
/// Bounds the number of sub-steps taken after a stall.
pub const MAX_FRAME_INTERVAL: f64 = 1.0 / 60.0;

/// Number of `update` calls between two object-position read-backs.
pub const DEFAULT_READBACK_PERIOD: u64 = 50;

/// Per-sub-step decay of a vertex's carried-over force.
pub const DEFAULT_DAMPING: f32 = 0.995;

/// Blend factor of the display-position smoothing pass.
pub const DEFAULT_SMOOTHING: f32 = 0.25;

/// Inflation applied to the force vector before it is used as the
/// closest-point search radius.
pub const DEFAULT_SEARCH_MARGIN: f32 = 1.001;

/// Floor applied to spring lengths before dividing by them.
pub const SPRING_LENGTH_EPSILON: f32 = 1.0e-6;

/// Tolerance on the barycentric test of the ray/triangle intersection.
pub const TRI_INTERSECT_EPSILON: f32 = 1.0e-5;

/// Floor on squared edge / normal lengths of degenerate triangles.
pub const DEGENERATE_AREA_THRESHOLD: f32 = 1.0e-12;

/// Default number of triangles a BVH leaf may hold.
pub const DEFAULT_MAX_LEAF_TRIANGLES: usize = 4;
