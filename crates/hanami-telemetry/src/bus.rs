//! Event bus: broadcast-style event dispatch with pluggable sinks.
//!
//! The bus uses `std::sync::mpsc` for thread-safe, lock-free event delivery.
//! Producers hold cheap [`EventSender`] clones; the bus owns the receiver
//! and dispatches to its sinks on [`EventBus::flush`].

use std::sync::mpsc;

use crate::events::{EventKind, SimulationEvent};
use crate::sinks::EventSink;

/// Producer handle of an [`EventBus`].
///
/// Sending never blocks. Events sent after the bus is dropped are lost.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<SimulationEvent>,
}

impl EventSender {
    /// Emits an event.
    pub fn emit(&self, event: SimulationEvent) {
        // The bus may already be gone at shutdown
        let _ = self.sender.send(event);
    }

    /// Emits `kind` tagged with `frame`.
    pub fn send(&self, frame: u64, kind: EventKind) {
        self.emit(SimulationEvent::new(frame, kind));
    }
}

/// Broadcast event bus for simulation telemetry.
pub struct EventBus {
    /// Channel sender, cloned into every [`EventSender`].
    sender: mpsc::Sender<SimulationEvent>,
    /// Channel receiver, owned by the bus for dispatching to sinks.
    receiver: mpsc::Receiver<SimulationEvent>,
    /// Registered sinks.
    sinks: Vec<Box<dyn EventSink>>,
    /// Whether the bus is active. Disabled bus drops events on flush.
    enabled: bool,
}

impl EventBus {
    /// Creates a new event bus with no sinks.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
        }
    }

    /// Returns a producer handle for this bus.
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Enables or disables the bus.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if the bus is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event directly. If the bus is disabled, this is a no-op.
    pub fn emit(&self, event: SimulationEvent) {
        if !self.enabled {
            return;
        }
        let _ = self.sender.send(event);
    }

    /// Flush all pending events to registered sinks and return how many
    /// were dispatched.
    ///
    /// Call this once per frame or at shutdown.
    pub fn flush(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok(event) = self.receiver.try_recv() {
            if !self.enabled {
                continue;
            }
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
            dispatched += 1;
        }
        dispatched
    }

    /// Flushes, then lets every sink finalize.
    pub fn finish(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
