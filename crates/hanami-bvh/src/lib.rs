//! # hanami-bvh
//!
//! Static spatial index over a collider triangle mesh.
//!
//! The hierarchy is built once on the host with the `bvh` crate, then
//! flattened into two [`StructuredArray`](hanami_buffer::StructuredArray)s:
//! depth-first nodes (left child at `node + 1`) and leaf-ordered
//! triangles. Two query kernels run over the flattened form:
//!
//! 1. **Ray intersection**: nearest hit distance and facing normal.
//! 2. **Closest point**: nearest surface point within a squared radius,
//!    with the outward triangle normal.
//!
//! Both are read-only, so any number of lanes may query concurrently.

pub mod builder;
pub mod geometry;
pub mod index;

pub use builder::BuildOptions;
pub use geometry::{ClosestPoint, Ray, RayHit};
pub use index::SpatialIndex;
