//! Simulation event types.
//!
//! Structured events emitted by the solver and the spatial index. Events
//! are lightweight value types that carry just enough data to be useful
//! for monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the engine.
///
/// Events are tagged with the frame counter at the time of emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Frame number (number of `update` calls that ran).
    pub frame: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Topology frozen and buffers allocated.
    Baked {
        objects: u32,
        vertices: u32,
        springs: u32,
    },

    /// One `update` call finished its sub-steps.
    Substeps {
        /// Sub-steps consumed this frame.
        count: u32,
        /// Accumulated simulation time (seconds).
        sim_time: f64,
    },

    /// An object was repositioned.
    ObjectReset { object: u32 },

    /// A periodic object-position read-back was published.
    Readback { objects: u32 },

    /// A call was rejected because of its state or arguments.
    Misuse {
        operation: String,
        reason: String,
    },

    /// A spatial index was built.
    ColliderBuilt {
        triangles: u32,
        nodes: u32,
        max_depth: u32,
    },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SimulationEvent {
    /// Creates a new event for the given frame.
    pub fn new(frame: u64, kind: EventKind) -> Self {
        Self { frame, kind }
    }

    /// Returns true for `Misuse` events.
    pub fn is_misuse(&self) -> bool {
        matches!(self.kind, EventKind::Misuse { .. })
    }
}
