//! # hanami-buffer
//!
//! Storage substrate shared by the particle solver and the spatial index.
//!
//! - [`StructuredArray`]: a record of named, fixed-type fields mapped onto
//!   one flat word buffer, addressable as `get(index, field)` /
//!   `set(index, field, value)` from the host and record-by-record from
//!   kernel lanes.
//! - [`ComputeBackend`]: launches a kernel as one lane per element, either
//!   sequentially (reference) or data-parallel over `rayon`.
//!
//! A launch is the only synchronization primitive: every write of one
//! launch is visible to every lane of the next.

pub mod backend;
pub mod layout;
pub mod structured;

pub use backend::ComputeBackend;
pub use layout::{FieldDesc, FieldType, FieldValue, StructLayout};
pub use structured::{Element, ElementMut, Field, StructuredArray};
