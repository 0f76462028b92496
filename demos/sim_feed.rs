//! Scripted telemetry feed for a running dvara-telemetry daemon.
//!
//! Streams the simulator's traffic (temperature walk, gravity accel,
//! proximity pulse train) at a sensor-node cadence so the full receive path
//! can be watched without hardware.
//!
//! Run the daemon in one terminal:
//! ```sh
//! RUST_LOG=info cargo run
//! ```
//!
//! Then feed it from another:
//! ```sh
//! cargo run --features mock --example sim_feed -- 127.0.0.1:12345 20
//! ```

use std::time::Duration;

use dvara_telemetry::sim::TelemetrySimulator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let target = args.get(1).map(String::as_str).unwrap_or("127.0.0.1:12345");
    let rate_hz: u32 = match args.get(2) {
        Some(raw) => raw.parse()?,
        None => 20,
    };
    let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1)));

    let mut sim = TelemetrySimulator::connect(target, 0)?;
    log::info!("Feeding scripted telegrams to {} at {} Hz", target, rate_hz);
    log::info!("Press Ctrl-C to stop");

    loop {
        let reading = sim.send_one()?;
        log::debug!(
            "Sent proximity={} temperature={:.2} encoder={}",
            reading.proximity,
            reading.temperature,
            reading.encoder_position
        );
        std::thread::sleep(period);
    }
}
