//! Sensor telegram wire format.
//!
//! One telegram is a single datagram payload of UTF-8 text holding ten
//! comma-separated fields in fixed positional order:
//!
//! | # | Field           | Type  |
//! |---|-----------------|-------|
//! | 0 | proximity       | int   |
//! | 1 | temperature     | float |
//! | 2 | accelX          | float |
//! | 3 | accelY          | float |
//! | 4 | accelZ          | float |
//! | 5 | gyroX           | float |
//! | 6 | gyroY           | float |
//! | 7 | gyroZ           | float |
//! | 8 | encoderPosition | int   |
//! | 9 | encoderSwitch   | int   |
//!
//! There is no escaping or quoting. The field count is validated before any
//! value parsing; a wrong count rejects the telegram whole. Within a valid
//! telegram each field parses independently, so one corrupt value cannot
//! take down the rest of the sample.

use crate::reading::Reading;
use crate::{Error, Result};

/// Number of comma-separated fields in a well-formed telegram.
pub const TELEGRAM_FIELDS: usize = 10;

/// Field names in wire order, for skip diagnostics.
const FIELD_NAMES: [&str; TELEGRAM_FIELDS] = [
    "proximity",
    "temperature",
    "accelX",
    "accelY",
    "accelZ",
    "gyroX",
    "gyroY",
    "gyroZ",
    "encoderPosition",
    "encoderSwitch",
];

/// Partial update decoded from one telegram.
///
/// `None` marks a field that failed to parse; on merge it keeps its previous
/// value instead of resetting to a default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelegramUpdate {
    pub proximity: Option<i32>,
    pub temperature: Option<f32>,
    pub accel: [Option<f32>; 3],
    pub gyro: [Option<f32>; 3],
    pub encoder_position: Option<i64>,
    pub encoder_switch: Option<i32>,
}

impl TelegramUpdate {
    /// Names of the fields that failed to parse, in wire order.
    pub fn skipped_fields(&self) -> Vec<&'static str> {
        let present = [
            self.proximity.is_some(),
            self.temperature.is_some(),
            self.accel[0].is_some(),
            self.accel[1].is_some(),
            self.accel[2].is_some(),
            self.gyro[0].is_some(),
            self.gyro[1].is_some(),
            self.gyro[2].is_some(),
            self.encoder_position.is_some(),
            self.encoder_switch.is_some(),
        ];
        FIELD_NAMES
            .iter()
            .zip(present)
            .filter_map(|(name, parsed)| if parsed { None } else { Some(*name) })
            .collect()
    }

    /// True when every field parsed.
    pub fn is_complete(&self) -> bool {
        self.skipped_fields().is_empty()
    }
}

/// Decodes one datagram payload.
///
/// Rejects the whole telegram when the payload is not UTF-8 text or does not
/// split into exactly [`TELEGRAM_FIELDS`] fields. Individual fields that fail
/// numeric parsing come back as `None`. Fields are trimmed first: senders
/// terminate records with a newline and may pad values with spaces.
pub fn parse_telegram(payload: &[u8]) -> Result<TelegramUpdate> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::MalformedTelegram("payload is not UTF-8 text".to_string()))?;

    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != TELEGRAM_FIELDS {
        return Err(Error::MalformedTelegram(format!(
            "expected {} fields, got {}",
            TELEGRAM_FIELDS,
            fields.len()
        )));
    }

    let field = |i: usize| fields[i].trim();

    Ok(TelegramUpdate {
        proximity: field(0).parse().ok(),
        temperature: field(1).parse().ok(),
        accel: [
            field(2).parse().ok(),
            field(3).parse().ok(),
            field(4).parse().ok(),
        ],
        gyro: [
            field(5).parse().ok(),
            field(6).parse().ok(),
            field(7).parse().ok(),
        ],
        encoder_position: field(8).parse().ok(),
        encoder_switch: field(9).parse().ok(),
    })
}

/// Renders a reading as one telegram payload, without a trailing newline.
pub fn encode_telegram(reading: &Reading) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{}",
        reading.proximity,
        reading.temperature,
        reading.accel[0],
        reading.accel[1],
        reading.accel[2],
        reading.gyro[0],
        reading.gyro[1],
        reading.gyro[2],
        reading.encoder_position,
        reading.encoder_switch,
    )
}
