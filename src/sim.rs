//! Scripted telemetry sender for hardware-free runs.
//!
//! Reproduces the traffic shape of the sensor node: gravity-dominated
//! accelerometer with gaussian jitter, a slow temperature walk, accumulating
//! encoder counts and a periodic proximity pulse train. The sender emits
//! real datagrams so the full receive path is exercised.

use std::net::UdpSocket;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::reading::Reading;
use crate::telegram::encode_telegram;
use crate::Result;

/// Packets between proximity pulse starts.
const PULSE_PERIOD: u64 = 40;
/// Packets a proximity pulse stays high.
const PULSE_WIDTH: u64 = 8;

/// Scripted sensor-state evolution, transport-free.
pub struct ScriptedSensors {
    rng: SmallRng,
    reading: Reading,
    samples: u64,
}

impl ScriptedSensors {
    /// Seed 0 draws from entropy; any other seed reproduces the same stream.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self {
            rng,
            reading: Reading {
                temperature: 22.0,
                accel: [0.0, 0.0, 9.81],
                ..Reading::zero()
            },
            samples: 0,
        }
    }

    fn gaussian(&mut self, std_dev: f32) -> f32 {
        let n: f32 = self.rng.sample(StandardNormal);
        n * std_dev
    }

    /// Advances the script by one sample and returns it.
    pub fn step(&mut self) -> Reading {
        let phase = self.samples % PULSE_PERIOD;
        self.reading.proximity = i32::from(phase < PULSE_WIDTH);
        self.reading.temperature += self.gaussian(0.05);
        self.reading.accel = [
            self.gaussian(0.02),
            self.gaussian(0.02),
            9.81 + self.gaussian(0.02),
        ];
        self.reading.gyro = [
            self.gaussian(0.5),
            self.gaussian(0.5),
            self.gaussian(0.5),
        ];
        self.reading.encoder_position += self.rng.gen_range(0..3i64);
        self.reading.encoder_switch = i32::from(self.rng.gen_range(0..100) == 0);
        self.samples += 1;
        self.reading
    }
}

/// Sends scripted telegrams to one receiver over a connected socket.
pub struct TelemetrySimulator {
    socket: UdpSocket,
    sensors: ScriptedSensors,
}

impl TelemetrySimulator {
    pub fn connect(target: &str, seed: u64) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(target)?;
        Ok(Self {
            socket,
            sensors: ScriptedSensors::new(seed),
        })
    }

    /// Sends one telegram and returns the reading it encoded.
    pub fn send_one(&mut self) -> Result<Reading> {
        let reading = self.sensors.step();
        self.socket.send(encode_telegram(&reading).as_bytes())?;
        Ok(reading)
    }

    /// Sends `count` telegrams paced at `rate_hz`.
    pub fn run(&mut self, count: u64, rate_hz: u32) -> Result<()> {
        let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1)));
        for _ in 0..count {
            self.send_one()?;
            std::thread::sleep(period);
        }
        Ok(())
    }
}
