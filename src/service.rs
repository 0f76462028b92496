//! Datagram receive loop and tick-driven publishing.
//!
//! [`TelemetryService::bind`] owns the socket for its whole lifetime. The
//! receive side runs either on a dedicated thread ([`spawn_receiver`]) or
//! in-line from a cooperative host ([`poll_receiver`]); both drain whatever
//! datagrams are queued and merge them into the shared state. Ticks are
//! always driven by the caller.
//!
//! Per-packet faults never take the listener down: malformed telegrams and
//! transient receive errors are logged and absorbed. Only the initial bind
//! can fail the service.
//!
//! [`spawn_receiver`]: TelemetryService::spawn_receiver
//! [`poll_receiver`]: TelemetryService::poll_receiver

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::config::NetworkConfig;
use crate::sinks::{DisplaySink, DoorSink, SinkRegistry};
use crate::state::{TelemetryState, TickSample};
use crate::telegram::parse_telegram;
use crate::{Error, Result};

/// Receive buffer size. Telegrams are ~100 bytes of text; anything that
/// truncates here fails field-count validation and is rejected.
const MAX_DATAGRAM: usize = 1024;

/// Idle sleep between drain passes on the dedicated receiver thread. Bounds
/// how long teardown waits for the loop to notice the shutdown flag.
const IDLE_POLL: Duration = Duration::from_millis(2);

/// Drains the telemetry socket and merges telegrams into shared state.
pub struct TelegramReceiver {
    socket: UdpSocket,
    state: Arc<TelemetryState>,
    running: Arc<AtomicBool>,
    buf: Vec<u8>,
}

impl TelegramReceiver {
    /// Drains every datagram currently queued on the socket. Returns the
    /// number of telegrams merged.
    ///
    /// Never fails: malformed payloads and transient receive faults are
    /// logged and absorbed so the listener survives.
    pub fn poll(&mut self) -> usize {
        let mut merged = 0;
        loop {
            match self.socket.recv_from(&mut self.buf) {
                Ok((len, from)) => match parse_telegram(&self.buf[..len]) {
                    Ok(update) => {
                        let skipped = update.skipped_fields();
                        if !skipped.is_empty() {
                            warn!(
                                "Telegram from {} skipped fields: {}",
                                from,
                                skipped.join(", ")
                            );
                        }
                        self.state.merge_update(&update);
                        trace!("Merged telegram from {}: {:?}", from, update);
                        merged += 1;
                    }
                    Err(e) => {
                        self.state
                            .counters
                            .telegrams_rejected
                            .fetch_add(1, Ordering::Relaxed);
                        warn!("Discarded telegram from {}: {}", from, e);
                    }
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    // Transient transport fault. Stop this drain pass; the
                    // caller re-polls and the listener stays up.
                    warn!("Receive error: {}", e);
                    break;
                }
            }
        }
        merged
    }

    /// Loop body for the dedicated receiver thread. Runs until the shutdown
    /// flag clears; the bounded idle sleep keeps teardown prompt.
    pub fn run(&mut self) {
        info!("Telegram receiver listening");
        while self.running.load(Ordering::Relaxed) {
            if self.poll() == 0 {
                std::thread::sleep(IDLE_POLL);
            }
        }
        info!("Telegram receiver stopped");
    }
}

/// Owns the socket, the shared telemetry state and the consumer registry.
pub struct TelemetryService {
    state: Arc<TelemetryState>,
    registry: SinkRegistry,
    receiver: Option<TelegramReceiver>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl TelemetryService {
    /// Binds the telemetry socket. A bind failure is fatal: the service is
    /// never constructed half-alive.
    pub fn bind(network: &NetworkConfig) -> Result<Self> {
        let socket = UdpSocket::bind(&network.listen_address)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        let state = Arc::new(TelemetryState::new());
        let running = Arc::new(AtomicBool::new(true));
        let receiver = TelegramReceiver {
            socket,
            state: Arc::clone(&state),
            running: Arc::clone(&running),
            buf: vec![0u8; MAX_DATAGRAM],
        };

        debug!("Bound telemetry socket on {}", local_addr);
        Ok(Self {
            state,
            registry: SinkRegistry::new(),
            receiver: Some(receiver),
            running,
            handle: None,
            local_addr,
        })
    }

    /// Address the socket actually bound, useful with an ephemeral port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Installs (or replaces) the display sink.
    pub fn set_display(&mut self, sink: Box<dyn DisplaySink>) {
        self.registry.set_display(sink);
    }

    /// Appends a named door sink.
    pub fn add_door(&mut self, name: impl Into<String>, sink: Box<dyn DoorSink>) {
        self.registry.add_door(name, sink);
    }

    /// Moves the receiver onto its own named thread.
    pub fn spawn_receiver(&mut self) -> Result<()> {
        let Some(mut receiver) = self.receiver.take() else {
            return Err(Error::Service("receiver already running".to_string()));
        };
        let handle = std::thread::Builder::new()
            .name("telegram-receiver".to_string())
            .spawn(move || receiver.run())?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Drains pending datagrams in-line. Cooperative-scheduler alternative
    /// to [`spawn_receiver`](Self::spawn_receiver); returns the number of
    /// telegrams merged.
    pub fn poll_receiver(&mut self) -> Result<usize> {
        match self.receiver.as_mut() {
            Some(receiver) => Ok(receiver.poll()),
            None => Err(Error::Service(
                "receiver was moved to its own thread".to_string(),
            )),
        }
    }

    /// One publish tick: samples the boundary, derives the edge pulses and
    /// pushes the snapshot to every registered sink. The caller controls the
    /// cadence; ticks and packet arrival are fully decoupled.
    pub fn tick(&mut self) -> TickSample {
        let sample = self.state.tick();
        if sample.rising_edge {
            debug!(
                "Proximity rising edge at tick {}",
                self.state.counters.ticks.load(Ordering::Relaxed)
            );
        }
        self.registry.publish(&sample);
        sample
    }

    /// Shared state handle for observers and diagnostics.
    pub fn state(&self) -> Arc<TelemetryState> {
        Arc::clone(&self.state)
    }

    /// Clears the running flag and joins the receiver thread if one was
    /// spawned. Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Telegram receiver thread panicked");
            }
        }
    }
}

impl Drop for TelemetryService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> NetworkConfig {
        NetworkConfig {
            listen_address: "127.0.0.1:0".to_string(),
        }
    }

    #[test]
    fn test_bind_reports_local_addr() {
        let service = TelemetryService::bind(&loopback()).unwrap();
        assert_ne!(service.local_addr().port(), 0);
    }

    #[test]
    fn test_bind_conflict_is_fatal() {
        let first = TelemetryService::bind(&loopback()).unwrap();
        let conflict = NetworkConfig {
            listen_address: first.local_addr().to_string(),
        };
        match TelemetryService::bind(&conflict) {
            Err(Error::Io(_)) => {}
            other => panic!("expected bind failure, got {:?}", other.map(|s| s.local_addr())),
        }
    }

    #[test]
    fn test_poll_after_spawn_is_an_error() {
        let mut service = TelemetryService::bind(&loopback()).unwrap();
        service.spawn_receiver().unwrap();
        assert!(matches!(service.poll_receiver(), Err(Error::Service(_))));
        service.stop();
    }

    #[test]
    fn test_tick_with_no_sinks_and_no_packets() {
        let mut service = TelemetryService::bind(&loopback()).unwrap();
        let sample = service.tick();
        assert!(!sample.rising_edge);
        assert_eq!(service.state().counters.ticks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut service = TelemetryService::bind(&loopback()).unwrap();
        service.spawn_receiver().unwrap();
        service.stop();
        service.stop();
    }
}
