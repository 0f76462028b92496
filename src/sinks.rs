//! Consumer sink traits and the per-tick publish registry.

use crate::state::TickSample;

/// Receives the boundary temperature once per tick. Implementations must not
/// block; long-running display work belongs on the consumer's side.
pub trait DisplaySink: Send {
    fn update_temperature(&mut self, celsius: f32);
}

/// Receives the one-tick proximity rising-edge pulse. Implementations must
/// not block; any open/close bookkeeping lives behind the sink.
pub trait DoorSink: Send {
    fn pulse(&mut self, rising_edge: bool);
}

/// Fixed set of consumers, iterated once per tick.
///
/// Absent sinks are skipped; publishing with nothing registered is a no-op.
#[derive(Default)]
pub struct SinkRegistry {
    display: Option<Box<dyn DisplaySink>>,
    doors: Vec<(String, Box<dyn DoorSink>)>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or replaces) the display sink.
    pub fn set_display(&mut self, sink: Box<dyn DisplaySink>) {
        self.display = Some(sink);
    }

    /// Appends a named door sink. The name only appears in diagnostics.
    pub fn add_door(&mut self, name: impl Into<String>, sink: Box<dyn DoorSink>) {
        self.doors.push((name.into(), sink));
    }

    /// Registered door names, in registration order.
    pub fn door_names(&self) -> impl Iterator<Item = &str> {
        self.doors.iter().map(|(name, _)| name.as_str())
    }

    /// Pushes one tick sample to every registered sink. Every door receives
    /// the same edge value.
    pub fn publish(&mut self, sample: &TickSample) {
        if let Some(display) = self.display.as_mut() {
            display.update_temperature(sample.reading.temperature);
        }
        for (_, door) in self.doors.iter_mut() {
            door.pulse(sample.rising_edge);
        }
    }
}
