//! End-to-end tests over a real loopback socket: datagrams in, sink
//! deliveries out. The cooperative `poll_receiver` path keeps the packet /
//! tick interleaving deterministic; one test covers the threaded receiver.

use std::net::UdpSocket;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;

use dvara_telemetry::config::NetworkConfig;
use dvara_telemetry::state::TelemetryState;
use dvara_telemetry::{DisplaySink, DoorSink, TelemetryService};

struct ChannelDisplay(crossbeam_channel::Sender<f32>);

impl DisplaySink for ChannelDisplay {
    fn update_temperature(&mut self, celsius: f32) {
        let _ = self.0.send(celsius);
    }
}

struct ChannelDoor(crossbeam_channel::Sender<bool>);

impl DoorSink for ChannelDoor {
    fn pulse(&mut self, rising_edge: bool) {
        let _ = self.0.send(rising_edge);
    }
}

fn bind_service() -> (TelemetryService, UdpSocket) {
    let service = TelemetryService::bind(&NetworkConfig {
        listen_address: "127.0.0.1:0".to_string(),
    })
    .expect("bind on loopback");
    let sender = UdpSocket::bind("127.0.0.1:0").expect("bind sender");
    sender.connect(service.local_addr()).expect("connect sender");
    (service, sender)
}

/// Polls the receiver in-line until `done` reports true or the deadline
/// passes. Loopback delivery is fast but still asynchronous.
fn poll_until(
    service: &mut TelemetryService,
    done: impl Fn(&TelemetryState) -> bool,
    timeout: Duration,
) {
    let state = service.state();
    let deadline = Instant::now() + timeout;
    while !done(&state) {
        assert!(Instant::now() < deadline, "timed out waiting for telemetry");
        service.poll_receiver().expect("receiver is pollable in-line");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_telegram_reaches_all_sinks() {
    let (mut service, sender) = bind_service();
    let (display_tx, display_rx) = unbounded();
    let (door1_tx, door1_rx) = unbounded();
    let (door2_tx, door2_rx) = unbounded();
    service.set_display(Box::new(ChannelDisplay(display_tx)));
    service.add_door("door1", Box::new(ChannelDoor(door1_tx)));
    service.add_door("door2", Box::new(ChannelDoor(door2_tx)));

    sender
        .send(b"1,25.3,0.0,0.0,9.8,0.0,0.0,0.0,10,0")
        .expect("send");
    poll_until(
        &mut service,
        |state| state.counters.telegrams_merged.load(Ordering::Relaxed) >= 1,
        Duration::from_secs(2),
    );

    service.tick();
    assert_eq!(display_rx.try_recv().expect("display delivery"), 25.3);
    assert!(door1_rx.try_recv().expect("door1 delivery"));
    assert!(door2_rx.try_recv().expect("door2 delivery"));

    // No packets between ticks: same temperature again, pulse cleared.
    service.tick();
    assert_eq!(display_rx.try_recv().expect("display delivery"), 25.3);
    assert!(!door1_rx.try_recv().expect("door1 delivery"));
    assert!(!door2_rx.try_recv().expect("door2 delivery"));
}

#[test]
fn test_malformed_telegrams_are_absorbed() {
    let (mut service, sender) = bind_service();

    sender.send(b"garbage").expect("send");
    sender.send(b"1,2,3,4,5,6,7,8,9").expect("send");
    sender.send(&[0xff, 0xfe, 0x2c, 0x31]).expect("send");
    sender
        .send(b"1,notafloat,0.0,0.0,9.8,0.0,0.0,0.0,5,1")
        .expect("send");

    poll_until(
        &mut service,
        |state| {
            state.counters.telegrams_rejected.load(Ordering::Relaxed) >= 3
                && state.counters.telegrams_merged.load(Ordering::Relaxed) >= 1
        },
        Duration::from_secs(2),
    );

    let state = service.state();
    let reading = state.snapshot();
    assert_eq!(reading.proximity, 1);
    assert_eq!(reading.temperature, 0.0, "failed field keeps its prior value");
    assert_eq!(reading.encoder_position, 5);
    assert_eq!(state.counters.fields_skipped.load(Ordering::Relaxed), 1);

    // The listener is still alive after the bad traffic.
    sender.send(b"0,18.5,0,0,9.8,0,0,0,6,0").expect("send");
    poll_until(
        &mut service,
        |state| state.counters.telegrams_merged.load(Ordering::Relaxed) >= 2,
        Duration::from_secs(2),
    );
    assert_eq!(state.snapshot().temperature, 18.5);
}

#[test]
fn test_receiver_thread_merges_and_stops_promptly() {
    let (mut service, sender) = bind_service();
    service.spawn_receiver().expect("spawn receiver");

    for i in 0..5 {
        let telegram = format!("0,2{}.0,0,0,9.8,0,0,0,{},0", i, i);
        sender.send(telegram.as_bytes()).expect("send");
    }

    let state = service.state();
    let deadline = Instant::now() + Duration::from_secs(2);
    while state.counters.telegrams_merged.load(Ordering::Relaxed) < 5 {
        assert!(
            Instant::now() < deadline,
            "receiver thread did not merge in time"
        );
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(state.snapshot().temperature, 24.0);
    assert_eq!(state.snapshot().encoder_position, 4);

    let stopping = Instant::now();
    service.stop();
    assert!(
        stopping.elapsed() < Duration::from_secs(1),
        "stop() blocked on the receiver thread"
    );
}

#[test]
fn test_boundary_sampling_over_live_socket() {
    let (mut service, sender) = bind_service();
    let (door_tx, door_rx) = unbounded();
    service.add_door("door", Box::new(ChannelDoor(door_tx)));

    sender.send(b"1,20.0,0,0,9.8,0,0,0,1,0").expect("send");
    poll_until(
        &mut service,
        |state| state.counters.telegrams_merged.load(Ordering::Relaxed) >= 1,
        Duration::from_secs(2),
    );
    assert!(service.tick().rising_edge);
    assert!(door_rx.try_recv().expect("door delivery"));

    // Drops to 0 and back to 1 between boundaries; the previous boundary
    // sampled 1, so the next tick must not fire.
    sender.send(b"0,20.0,0,0,9.8,0,0,0,2,0").expect("send");
    poll_until(
        &mut service,
        |state| state.counters.telegrams_merged.load(Ordering::Relaxed) >= 2,
        Duration::from_secs(2),
    );
    sender.send(b"1,20.0,0,0,9.8,0,0,0,3,0").expect("send");
    poll_until(
        &mut service,
        |state| state.counters.telegrams_merged.load(Ordering::Relaxed) >= 3,
        Duration::from_secs(2),
    );

    assert!(!service.tick().rising_edge);
    assert!(!door_rx.try_recv().expect("door delivery"));
}
