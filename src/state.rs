//! Shared telemetry state and tick-boundary edge detection.
//!
//! One [`TelemetryState`] is shared between the receive context (merging
//! telegrams as they arrive) and the tick context (sampling and publishing).
//! All mutation funnels through [`merge_update`] and [`tick`], which
//! serialize on the same lock, so a half-merged reading is never observable
//! and each tick captures one consistent snapshot.
//!
//! Edge detection is tick-boundary sampled: [`tick`] compares the proximity
//! value at this boundary against the value at the previous boundary. A
//! 0-to-1-to-0 excursion between two boundaries is invisible; only the
//! sampled values count.
//!
//! [`merge_update`]: TelemetryState::merge_update
//! [`tick`]: TelemetryState::tick

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::reading::Reading;
use crate::telegram::{TelegramUpdate, TELEGRAM_FIELDS};

/// Lock-free diagnostics shared by the receive and tick contexts.
#[derive(Debug, Default)]
pub struct StateCounters {
    /// Telegrams whose parsed fields merged into the state.
    pub telegrams_merged: AtomicU64,
    /// Datagrams rejected whole (wrong field count, not text).
    pub telegrams_rejected: AtomicU64,
    /// Individual fields skipped inside otherwise valid telegrams.
    pub fields_skipped: AtomicU64,
    /// Publish ticks executed.
    pub ticks: AtomicU64,
}

/// Last-merge instants, one per wire field. `None` until that field first
/// parses successfully.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStamps {
    pub proximity: Option<Instant>,
    pub temperature: Option<Instant>,
    pub accel: [Option<Instant>; 3],
    pub gyro: [Option<Instant>; 3],
    pub encoder_position: Option<Instant>,
    pub encoder_switch: Option<Instant>,
}

impl FieldStamps {
    fn record(&mut self, update: &TelegramUpdate, now: Instant) {
        if update.proximity.is_some() {
            self.proximity = Some(now);
        }
        if update.temperature.is_some() {
            self.temperature = Some(now);
        }
        for i in 0..3 {
            if update.accel[i].is_some() {
                self.accel[i] = Some(now);
            }
            if update.gyro[i].is_some() {
                self.gyro[i] = Some(now);
            }
        }
        if update.encoder_position.is_some() {
            self.encoder_position = Some(now);
        }
        if update.encoder_switch.is_some() {
            self.encoder_switch = Some(now);
        }
    }

    /// Newest stamp across all fields, `None` before any merge.
    pub fn last_update(&self) -> Option<Instant> {
        [
            self.proximity,
            self.temperature,
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2],
            self.encoder_position,
            self.encoder_switch,
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

/// Snapshot published to sinks at one tick boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSample {
    /// Merged reading at the boundary.
    pub reading: Reading,
    /// True only when proximity sampled 0 at the previous boundary and 1 now.
    pub rising_edge: bool,
    /// The same one-tick pulse for the encoder switch.
    pub switch_rising_edge: bool,
}

#[derive(Debug)]
struct StateInner {
    current: Reading,
    previous_proximity: i32,
    previous_switch: i32,
    stamps: FieldStamps,
}

/// Owns every mutable value shared between the receive and tick contexts.
pub struct TelemetryState {
    inner: Mutex<StateInner>,
    pub counters: StateCounters,
}

impl TelemetryState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StateInner {
                current: Reading::zero(),
                previous_proximity: 0,
                previous_switch: 0,
                stamps: FieldStamps::default(),
            }),
            counters: StateCounters::default(),
        }
    }

    /// Merges the parsed fields of one telegram. Receive-path entry point.
    /// Returns how many fields were applied.
    pub fn merge_update(&self, update: &TelegramUpdate) -> usize {
        let now = Instant::now();
        let applied = {
            let mut inner = self.inner.lock();
            let applied = inner.current.merge(update);
            inner.stamps.record(update, now);
            applied
        };
        self.counters.telegrams_merged.fetch_add(1, Ordering::Relaxed);
        let skipped = (TELEGRAM_FIELDS - applied) as u64;
        if skipped > 0 {
            self.counters.fields_skipped.fetch_add(skipped, Ordering::Relaxed);
        }
        applied
    }

    /// Samples the boundary, derives the one-tick edge pulses and advances
    /// the previous-boundary values. Tick-path entry point.
    pub fn tick(&self) -> TickSample {
        let sample = {
            let mut inner = self.inner.lock();
            let rising_edge = inner.previous_proximity == 0 && inner.current.proximity == 1;
            let switch_rising_edge = inner.previous_switch == 0 && inner.current.encoder_switch == 1;
            inner.previous_proximity = inner.current.proximity;
            inner.previous_switch = inner.current.encoder_switch;
            TickSample {
                reading: inner.current,
                rising_edge,
                switch_rising_edge,
            }
        };
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        sample
    }

    /// Copy of the current merged reading.
    pub fn snapshot(&self) -> Reading {
        self.inner.lock().current
    }

    /// Copy of the per-field last-merge stamps.
    pub fn stamps(&self) -> FieldStamps {
        self.inner.lock().stamps
    }

    /// Age of the newest merged field, `None` before any merge.
    pub fn telemetry_age(&self) -> Option<Duration> {
        self.inner.lock().stamps.last_update().map(|t| t.elapsed())
    }

    /// True when any field merged within `max_age`.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.telemetry_age().map(|age| age <= max_age).unwrap_or(false)
    }
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}
