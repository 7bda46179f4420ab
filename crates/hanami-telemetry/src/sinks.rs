//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them
//! (log through `tracing`, collect for inspection, etc.).

use std::sync::{Arc, Mutex};

use tracing::Level;

use crate::events::{EventKind, SimulationEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called when the simulation ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Shared view of the events collected by a [`VecSink`].
#[derive(Debug, Clone, Default)]
pub struct SharedEvents {
    inner: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl SharedEvents {
    /// Copies out everything collected so far.
    pub fn snapshot(&self) -> Vec<SimulationEvent> {
        self.inner.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of collected events.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A sink that collects events in memory for testing and inspection.
///
/// The collected events stay reachable through [`VecSink::events`] after
/// the sink is boxed into a bus.
#[derive(Debug, Default)]
pub struct VecSink {
    events: SharedEvents,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the collected events.
    pub fn events(&self) -> SharedEvents {
        self.events.clone()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        if let Ok(mut events) = self.events.inner.lock() {
            events.push(event.clone());
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events using the `tracing` crate.
///
/// Misuse events are always logged at `WARN`; everything else at the
/// configured level.
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    /// Creates a new tracing sink at the given log level.
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        if let EventKind::Misuse { operation, reason } = &event.kind {
            tracing::warn!(frame = event.frame, %operation, %reason, "simulation_event");
            return;
        }
        if self.level == Level::TRACE {
            tracing::trace!(frame = event.frame, event = ?event.kind, "simulation_event");
        } else if self.level == Level::DEBUG {
            tracing::debug!(frame = event.frame, event = ?event.kind, "simulation_event");
        } else {
            tracing::info!(frame = event.frame, event = ?event.kind, "simulation_event");
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
