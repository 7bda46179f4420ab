//! # hanami-telemetry
//!
//! Event bus for simulation telemetry. The solver emits structured events
//! (bake, sub-stepping, resets, read-backs, misuse) through an
//! [`EventSender`]; the host drains them into pluggable sinks.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::{EventBus, EventSender};
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, SharedEvents, TracingSink, VecSink};
