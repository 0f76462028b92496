//! Error types for telemetry operations.

/// Result type for dvara-telemetry operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport faults. Fatal only when binding the socket; receive-side
    /// instances are logged and absorbed by the service loop.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload rejected whole: not UTF-8 text or wrong field count.
    #[error("Malformed telegram: {0}")]
    MalformedTelegram(String),

    /// Configuration load or parse failure. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service lifecycle misuse, e.g. polling a receiver that was moved to
    /// its own thread.
    #[error("Service error: {0}")]
    Service(String),
}
