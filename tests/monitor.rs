mod common;

use bmumon_lib::{
    BatteryMonitor, BatteryStatus, Error, FrameError, MonitorOptions, RetryPolicy,
    TrailerRecovery,
};
use bmumon_lib::monitor::RESPONSE_TIMEOUT;
use common::*;
use std::time::Duration;

fn monitor(
    replies: Vec<Reply>,
) -> BatteryMonitor<ScriptedTransport, impl Fn() -> Duration> {
    let mut monitor =
        BatteryMonitor::with_clock(ScriptedTransport::new(replies), || Duration::from_secs(3725));
    monitor.set_retry(RetryPolicy {
        max_attempts: 1,
        delay: Duration::ZERO,
    });
    monitor
}

fn replace(replies: &mut [Reply], metric: Metric, reply: Reply) {
    let index = catalog::SNAPSHOT_SEQUENCE
        .iter()
        .position(|d| d.metric == metric)
        .unwrap();
    replies[index] = reply;
}

#[test]
fn reads_a_full_snapshot() {
    let battery = Battery::default();
    let mut monitor = monitor(battery.replies());

    let snapshot = monitor.read_snapshot().unwrap();

    assert!(snapshot.is_valid());
    assert_eq!(snapshot.status, BatteryStatus::Charging);
    assert_eq!(snapshot.serial, "BMU0123456789");
    assert_eq!(snapshot.remaining_capacity_percent, 87);
    assert_eq!(snapshot.remaining_capacity, 5220);
    assert_eq!(snapshot.factory_capacity, 6000);
    assert_eq!(snapshot.actual_capacity, 5900);
    assert_eq!(snapshot.state_of_health(), 98);
    assert_eq!(snapshot.current, 2.5);
    assert_eq!(snapshot.voltage, 39.0);
    assert_eq!(snapshot.power, 97.5);
    assert_eq!(snapshot.temperatures, [25, 23]);
    assert_eq!(snapshot.cell_voltages, battery.cells);
    assert_eq!(snapshot.uptime, 3725);

    let transport = monitor.into_inner();
    let sent: Vec<Vec<u8>> = catalog::SNAPSHOT_SEQUENCE
        .iter()
        .map(|d| d.request.to_vec())
        .collect();
    assert_eq!(transport.written, sent);
}

#[test]
fn silent_channel_times_out() {
    let mut monitor = monitor(vec![Reply::Silence]);

    let err = monitor.read_snapshot().unwrap_err();
    assert!(
        matches!(
            err,
            Error::CommunicationTimeout {
                metric: Metric::Status,
                ..
            }
        ),
        "{err:?}"
    );
    assert_eq!(monitor.transport_mut().waits, [RESPONSE_TIMEOUT]);

    let snapshot = monitor.poll();
    assert!(!snapshot.is_valid());
    assert!(!snapshot.error.is_empty());
}

#[test]
fn failure_aborts_the_rest_of_the_sequence() {
    let mut replies = Battery::default().replies();
    replace(&mut replies, Metric::RemainingCapacity, Reply::Silence);
    let mut monitor = monitor(replies);

    let err = monitor.read_snapshot().unwrap_err();
    assert_eq!(err.metric(), Some(Metric::RemainingCapacity));

    let transport = monitor.into_inner();
    assert_eq!(transport.written.len(), 4);
    assert_eq!(transport.remaining_replies(), 6);
}

#[test]
fn bad_checksum_is_frame_corruption() {
    let battery = Battery::default();
    let mut replies = battery.replies();
    let mut reply = battery.reply_for(Metric::Voltage);
    reply[7] ^= 0x10;
    replace(&mut replies, Metric::Voltage, Reply::Bytes(reply));

    let err = monitor(replies).read_snapshot().unwrap_err();
    match err {
        Error::FrameCorruption {
            metric: Metric::Voltage,
            source: FrameError::Checksum { .. },
        } => {}
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn oversize_length_is_frame_corruption() {
    let mut replies = Battery::default().replies();
    replace(
        &mut replies,
        Metric::Status,
        Reply::Bytes(vec![0x5a, 0xa5, 0x40, 0x22, 0x20, 0x04, 0x30, 0x01, 0x00]),
    );

    let err = monitor(replies).read_snapshot().unwrap_err();
    assert!(
        matches!(
            err,
            Error::FrameCorruption {
                source: FrameError::Oversize { declared: 0x40 },
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn garbage_before_a_response_is_skipped() {
    let battery = Battery::default();
    let mut replies = battery.replies();
    let mut noisy = vec![0x00, 0x5a, 0x13, 0xff];
    noisy.extend(battery.reply_for(Metric::CellVoltages));
    replace(&mut replies, Metric::CellVoltages, Reply::Bytes(noisy));

    let snapshot = monitor(replies).read_snapshot().unwrap();
    assert_eq!(snapshot.cell_voltages, battery.cells);
}

#[test]
fn only_garbage_is_frame_corruption() {
    let mut replies = Battery::default().replies();
    replace(&mut replies, Metric::Status, Reply::Bytes(vec![0x13, 0x37, 0xa5]));

    let err = monitor(replies).read_snapshot().unwrap_err();
    assert!(
        matches!(
            err,
            Error::FrameCorruption {
                source: FrameError::NoHeader,
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn missing_final_trailer_byte_is_recovered() {
    let battery = Battery::default();
    let mut replies = battery.replies();
    let mut reply = battery.reply_for(Metric::Status);
    assert_eq!(reply.pop(), Some(0xff));
    replace(&mut replies, Metric::Status, Reply::Bytes(reply));

    let snapshot = monitor(replies.clone()).read_snapshot().unwrap();
    assert_eq!(snapshot.status, BatteryStatus::Charging);

    let mut strict = monitor(replies);
    strict.set_options(MonitorOptions {
        trailer_recovery: TrailerRecovery::Reject,
        ..*strict.options()
    });
    let err = strict.read_snapshot().unwrap_err();
    assert!(
        matches!(
            err,
            Error::FrameCorruption {
                metric: Metric::Status,
                source: FrameError::Incomplete { .. },
            }
        ),
        "{err:?}"
    );
}

#[test]
fn retry_policy_resends_the_failed_request() {
    let battery = Battery::default();
    let mut replies = battery.replies();
    replies.insert(2, Reply::Silence);
    let mut monitor = monitor(replies);
    monitor.set_retry(RetryPolicy {
        max_attempts: 2,
        delay: Duration::ZERO,
    });

    let snapshot = monitor.read_snapshot().unwrap();
    assert_eq!(snapshot.remaining_capacity_percent, 87);

    let transport = monitor.into_inner();
    assert_eq!(transport.written.len(), 11);
    assert_eq!(transport.written[2], transport.written[3]);
}

#[test]
fn retries_are_bounded() {
    let mut monitor = monitor(vec![Reply::Silence; 5]);
    monitor.set_retry(RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
    });

    assert!(monitor.read_snapshot().is_err());
    assert_eq!(monitor.into_inner().written.len(), 3);
}

#[test]
fn consecutive_readings_are_independent() {
    let first = Battery::default();
    let second = Battery {
        status: 0,
        serial: b"SECOND-BATTERY",
        current: -120,
        voltage: 3610,
        temperatures: [20, 60],
        cells: [3610; 10],
        ..Battery::default()
    };
    let mut replies = first.replies();
    replies.extend(second.replies());
    let mut monitor = monitor(replies);

    let a = monitor.read_snapshot().unwrap();
    let b = monitor.read_snapshot().unwrap();

    assert_eq!(a.status, BatteryStatus::Charging);
    assert_eq!(a.serial, "BMU0123456789");
    assert_eq!(b.status, BatteryStatus::Discharging);
    assert_eq!(b.serial, "SECOND-BATTERY");
    assert_eq!(b.current, -1.2);
    assert_eq!(b.voltage, 36.1);
    assert_eq!(b.temperatures, [0, 40]);
    assert_eq!(b.cell_voltages, [3610; 10]);
    assert_eq!(a.remaining_capacity, b.remaining_capacity);
}

#[test]
fn stale_input_is_dropped_before_a_request() {
    let battery = Battery::default();
    let mut monitor = monitor(battery.replies());
    // late answer to some earlier request
    monitor
        .transport_mut()
        .preload(&battery.reply_for(Metric::Voltage));

    let snapshot = monitor.read_snapshot().unwrap();
    assert_eq!(snapshot.status, BatteryStatus::Charging);
}

#[test]
fn echo_check_rejects_a_reply_for_another_register() {
    let battery = Battery::default();
    let mut replies = battery.replies();
    replace(
        &mut replies,
        Metric::FactoryCapacity,
        Reply::Bytes(battery.reply_for(Metric::ActualCapacity)),
    );

    let lenient = monitor(replies.clone()).read_snapshot().unwrap();
    assert_eq!(lenient.factory_capacity, 5900);

    let mut strict = monitor(replies);
    strict.set_options(MonitorOptions {
        verify_echo: true,
        ..*strict.options()
    });
    let err = strict.read_snapshot().unwrap_err();
    assert!(
        matches!(
            err,
            Error::FrameCorruption {
                metric: Metric::FactoryCapacity,
                source: FrameError::EchoMismatch {
                    expected: 0x18,
                    received: 0x19
                },
            }
        ),
        "{err:?}"
    );
}

#[test]
fn short_payload_is_rejected() {
    let mut replies = Battery::default().replies();
    replace(
        &mut replies,
        Metric::Serial,
        Reply::Bytes(response(0x10, b"BMU")),
    );

    let err = monitor(replies).read_snapshot().unwrap_err();
    assert!(
        matches!(
            err,
            Error::FrameCorruption {
                source: FrameError::ShortPayload {
                    expected: 14,
                    received: 3
                },
                ..
            }
        ),
        "{err:?}"
    );
}

#[test]
fn query_returns_a_single_frame() {
    let battery = Battery::default();
    let mut monitor = monitor(vec![Reply::Bytes(battery.reply_for(Metric::Temperature))]);

    let frame = monitor.query(Metric::Temperature).unwrap();
    assert_eq!(frame.arg(), 0x35);
    assert_eq!(frame.payload(), &[45, 43]);
    assert_eq!(
        monitor.into_inner().written,
        vec![catalog::TEMPERATURE.request.to_vec()]
    );
}
