//! # hanami-mesh
//!
//! Static collider geometry in Structure-of-Arrays (SoA) layout.
//!
//! ## Key Types
//!
//! - [`TriangleMesh`]: positions and triangle indices in contiguous SoA
//!   buffers, optionally split into [`TriangleGroup`]s.
//! - Procedural generators for tests and headless scenes (quad grids,
//!   UV spheres, a single ground triangle).

pub mod generators;
pub mod mesh;

pub use mesh::{TriangleGroup, TriangleMesh};
