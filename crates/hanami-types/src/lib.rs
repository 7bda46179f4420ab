//! # hanami-types
//!
//! Shared identifiers, error types, and simulation constants
//! for the hanami petal simulation.
//!
//! This crate has zero domain logic; it defines the vocabulary
//! that all other hanami crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{HanamiError, HanamiResult};
pub use ids::{ObjectId, SpringId, VertexId};
