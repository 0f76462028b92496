//! Sensor telemetry over UDP: receive, decode, dispatch.
//!
//! A long-lived service owns a datagram socket, merges comma-separated
//! sensor telegrams into shared state with per-field fault tolerance, and on
//! every externally-driven tick publishes a consistent snapshot to the
//! registered consumer sinks: the temperature display and the door
//! actuators listening for the proximity rising edge.
//!
//! The receive loop and the tick loop are decoupled. Packets merge whenever
//! they arrive; edge detection only compares values sampled at tick
//! boundaries, so a 0-to-1-to-0 excursion between two ticks goes unseen.
//!
//! ## Features
//!
//! - `mock`: scripted telemetry simulator for hardware-free runs

pub mod config;
pub mod error;
pub mod reading;
pub mod service;
#[cfg(feature = "mock")]
pub mod sim;
pub mod sinks;
pub mod state;
pub mod telegram;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use reading::Reading;
pub use service::TelemetryService;
pub use sinks::{DisplaySink, DoorSink, SinkRegistry};
pub use state::{TelemetryState, TickSample};
pub use telegram::{parse_telegram, TelegramUpdate};
