//! dvara-telemetry daemon: binds the telemetry socket, runs the receiver on
//! its own thread and drives the publish tick at a fixed cadence.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};

use dvara_telemetry::state::TelemetryState;
use dvara_telemetry::{AppConfig, DisplaySink, DoorSink, Error, Result, TelemetryService};

const DEFAULT_CONFIG_PATH: &str = "dvara.toml";

/// Logs the boundary temperature, only when it changes at 0.1 °C
/// resolution so a 60 Hz tick does not flood the log.
struct ConsoleDisplay {
    last_shown: Option<f32>,
}

impl ConsoleDisplay {
    fn new() -> Self {
        Self { last_shown: None }
    }
}

impl DisplaySink for ConsoleDisplay {
    fn update_temperature(&mut self, celsius: f32) {
        let rounded = (celsius * 10.0).round() / 10.0;
        if self.last_shown != Some(rounded) {
            info!("Display: {:.1} °C", rounded);
            self.last_shown = Some(rounded);
        }
    }
}

/// Toggles an open/closed latch on each rising-edge pulse.
struct ToggleDoor {
    name: String,
    open: bool,
}

impl ToggleDoor {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            open: false,
        }
    }
}

impl DoorSink for ToggleDoor {
    fn pulse(&mut self, rising_edge: bool) {
        if rising_edge {
            self.open = !self.open;
            info!(
                "Door {}: {}",
                self.name,
                if self.open { "opening" } else { "closing" }
            );
        }
    }
}

/// Accepts a config path as a positional argument or after --config/-c.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    return Some(args[i + 1].clone());
                }
            }
            arg if !arg.starts_with('-') => return Some(arg.to_string()),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Explicit path must load; otherwise ./dvara.toml if present, else the
/// built-in defaults. Returns the config and a description of its source.
fn load_config(path: Option<String>) -> Result<(AppConfig, String)> {
    match path {
        Some(path) => {
            let config = AppConfig::from_file(&path)?;
            Ok((config, path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            let config = AppConfig::from_file(DEFAULT_CONFIG_PATH)?;
            Ok((config, DEFAULT_CONFIG_PATH.to_string()))
        }
        None => Ok((AppConfig::default(), "built-in defaults".to_string())),
    }
}

fn log_stats(state: &TelemetryState) {
    let counters = &state.counters;
    let last_rx = match state.telemetry_age() {
        Some(age) => format!("{:.1}s ago", age.as_secs_f32()),
        None => "never".to_string(),
    };
    info!(
        "Stats: merged={} rejected={} fields_skipped={} ticks={} last_rx={}",
        counters.telegrams_merged.load(Ordering::Relaxed),
        counters.telegrams_rejected.load(Ordering::Relaxed),
        counters.fields_skipped.load(Ordering::Relaxed),
        counters.ticks.load(Ordering::Relaxed),
        last_rx,
    );
}

fn run(config: AppConfig) -> Result<()> {
    let mut service = TelemetryService::bind(&config.network)?;
    info!("Listening for telegrams on {}", service.local_addr());

    if config.sinks.display {
        service.set_display(Box::new(ConsoleDisplay::new()));
        info!("Registered display sink");
    }
    for name in &config.sinks.doors {
        service.add_door(name.clone(), Box::new(ToggleDoor::new(name)));
        info!("Registered door sink '{}'", name);
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Service(format!("failed to install signal handler: {}", e)))?;

    service.spawn_receiver()?;

    let tick_period = Duration::from_secs_f64(1.0 / f64::from(config.service.tick_hz.max(1)));
    let ticker = crossbeam_channel::tick(tick_period);
    let stats_interval = Duration::from_secs(config.service.stats_interval_secs);
    let state = service.state();
    let mut last_stats = Instant::now();

    info!("Ticking at {} Hz. Press Ctrl-C to stop.", config.service.tick_hz.max(1));
    while running.load(Ordering::Relaxed) {
        // Bounded wait so Ctrl-C is noticed even at very low tick rates.
        if ticker.recv_timeout(Duration::from_millis(200)).is_ok() {
            service.tick();
        }
        if config.service.stats_interval_secs > 0 && last_stats.elapsed() >= stats_interval {
            log_stats(&state);
            last_stats = Instant::now();
        }
    }

    info!("Shutting down");
    service.stop();
    log_stats(&state);
    Ok(())
}

fn main() {
    let (config, source) = match load_config(parse_config_path()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("dvara-telemetry: {}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    info!("Starting dvara-telemetry v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);

    if let Err(e) = run(config) {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
