//! Merged sensor sample.

use crate::telegram::TelegramUpdate;

/// Most recently merged values from the sensor stream.
///
/// Starts zero-valued before any telemetry arrives. Fields only ever change
/// through [`merge`](Reading::merge), which applies the parsed slots of a
/// telegram and leaves failed ones at their previous value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Digital proximity input, expected 0 or 1.
    pub proximity: i32,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Accelerometer x, y, z as reported by the sensor.
    pub accel: [f32; 3],
    /// Gyroscope x, y, z as reported by the sensor.
    pub gyro: [f32; 3],
    /// Rotary encoder position counter.
    pub encoder_position: i64,
    /// Encoder push switch, expected 0 or 1.
    pub encoder_switch: i32,
}

impl Reading {
    /// Zero-valued reading used before the first telegram.
    pub fn zero() -> Self {
        Self {
            proximity: 0,
            temperature: 0.0,
            accel: [0.0; 3],
            gyro: [0.0; 3],
            encoder_position: 0,
            encoder_switch: 0,
        }
    }

    /// Applies the parsed fields of `update`, leaving `None` slots untouched.
    /// Returns how many fields were applied.
    pub fn merge(&mut self, update: &TelegramUpdate) -> usize {
        let mut applied = 0;
        if let Some(v) = update.proximity {
            self.proximity = v;
            applied += 1;
        }
        if let Some(v) = update.temperature {
            self.temperature = v;
            applied += 1;
        }
        for i in 0..3 {
            if let Some(v) = update.accel[i] {
                self.accel[i] = v;
                applied += 1;
            }
            if let Some(v) = update.gyro[i] {
                self.gyro[i] = v;
                applied += 1;
            }
        }
        if let Some(v) = update.encoder_position {
            self.encoder_position = v;
            applied += 1;
        }
        if let Some(v) = update.encoder_switch {
            self.encoder_switch = v;
            applied += 1;
        }
        applied
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::zero()
    }
}
