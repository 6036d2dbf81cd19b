mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use balboa_proto::spa::Error;
use balboa_proto::{ClientId, Registration, Settings, TempScale};
use common::*;

const IDENTITY_REQUEST: [u8; 10] = [0x7E, 0x08, 0xFE, 0xBF, 0x01, 0x02, 0xF1, 0x73, 0xB9, 0x7E];
const ACK_7: [u8; 7] = [0x7E, 0x05, 0x07, 0xBF, 0x03, 0xF3, 0x7E];
const CONFIG_REQUEST_7: [u8; 10] = [0x7E, 0x08, 0x07, 0xBF, 0x22, 0x00, 0x00, 0x01, 0x9A, 0x7E];
const FAULT_LOG_REQUEST_7: [u8; 10] = [0x7E, 0x08, 0x07, 0xBF, 0x22, 0x20, 0xFF, 0x00, 0x09, 0x7E];

fn registered_spa(bench: &Bench, settings: Settings, now: Instant) -> TestSpa {
    let mut spa = bench.spa(settings);
    bench.push_rx(&new_client_poll());
    bench.push_rx(&assign_id(7));
    spa.update_at(now).unwrap();
    bench.take_tx();
    bench.take_trace();
    spa
}

#[test]
fn registration_in_one_pass() {
    init_logging();
    let bench = Bench::new();
    let mut spa = bench.spa(Settings::default());
    bench.push_rx(&new_client_poll());
    bench.push_rx(&assign_id(7));
    bench.push_rx(&clear_to_send(7));
    spa.update().unwrap();

    let mut expected = IDENTITY_REQUEST.to_vec();
    expected.extend_from_slice(&ACK_7);
    expected.extend_from_slice(&CONFIG_REQUEST_7);
    assert_eq!(bench.take_tx(), expected);
    assert_eq!(
        spa.client().registration(),
        Registration::Registered(ClientId::new(7).unwrap())
    );
    assert_eq!(bench.serial.borrow().unread(), 0);
}

#[test]
fn direction_pin_brackets_transmission() {
    init_logging();
    let bench = Bench::new();
    let now = Instant::now();
    let mut spa = registered_spa(&bench, Settings::default(), now);

    bench.push_rx(&clear_to_send(7));
    spa.update_at(now).unwrap();
    assert_eq!(
        bench.take_trace(),
        vec![
            Event::PinHigh,
            Event::DelayUs(80),
            Event::Write(CONFIG_REQUEST_7.to_vec()),
            Event::Flush,
            Event::DelayUs(80),
            Event::PinLow,
        ]
    );
}

#[test]
fn guard_delay_follows_baud_rate() {
    let bench = Bench::new();
    let now = Instant::now();
    let mut spa = registered_spa(&bench, Settings::default().with_baud_rate(9600), now);
    bench.push_rx(&clear_to_send(7));
    spa.update_at(now).unwrap();
    let trace = bench.take_trace();
    assert_eq!(trace[1], Event::DelayUs(1042));
}

#[test]
fn silent_bus_transmits_nothing() {
    let bench = Bench::new();
    let mut spa = bench.spa(Settings::default());
    let trace = bench.take_trace();
    assert_eq!(trace, vec![Event::PinLow]);

    spa.update().unwrap();
    // status and other clients' traffic need no reply
    bench.push_rx(&status(&status_payload(76, 70, 12, 0)));
    bench.push_rx(&clear_to_send(8));
    spa.update().unwrap();
    assert!(bench.take_tx().is_empty());
    assert!(bench.take_trace().is_empty());
}

#[test]
fn listeners_see_every_pass() {
    init_logging();
    let bench = Bench::new();
    let settings = Settings::default().with_native_scale(TempScale::Celsius);
    let mut spa = bench.spa(settings);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    spa.add_listener(move |state| sink.borrow_mut().push(state.target_temp));

    spa.update().unwrap();
    bench.push_rx(&status(&status_payload(76, 70, 12, 0)));
    spa.update().unwrap();
    spa.update().unwrap();
    assert_eq!(*seen.borrow(), vec![None, Some(38.0), Some(38.0)]);
}

#[test]
fn command_sent_on_clear_to_send() {
    init_logging();
    let bench = Bench::new();
    let now = Instant::now();
    let settings = Settings::default().with_native_scale(TempScale::Celsius);
    let mut spa = registered_spa(&bench, settings, now);

    spa.client_mut().set_temperature(38.0).unwrap();
    bench.push_rx(&clear_to_send(7));
    spa.update_at(now).unwrap();
    assert_eq!(
        bench.take_tx(),
        vec![0x7E, 0x06, 0x07, 0xBF, 0x20, 0x4C, 0x0F, 0x7E]
    );
    assert_eq!(spa.client().pending_command(), None);

    // the bootstrap continues on the next opportunity
    bench.push_rx(&clear_to_send(7));
    spa.update_at(now).unwrap();
    assert_eq!(bench.take_tx(), CONFIG_REQUEST_7.to_vec());
}

#[test]
fn communication_loss_drops_registration() {
    init_logging();
    let bench = Bench::new();
    let now = Instant::now();
    let mut spa = registered_spa(&bench, Settings::default(), now);
    assert!(spa.client().is_communicating());

    spa.update_at(now + Duration::from_secs(5)).unwrap();
    assert!(spa.client().is_communicating());

    let later = now + Duration::from_secs(11);
    spa.update_at(later).unwrap();
    assert_eq!(spa.client().registration(), Registration::Unregistered);
    assert!(spa.client().communication_lost());

    // a clear to send for our old id is not ours anymore
    bench.push_rx(&clear_to_send(7));
    spa.update_at(later).unwrap();
    assert!(bench.take_tx().is_empty());

    bench.push_rx(&assign_id(7));
    bench.push_rx(&clear_to_send(7));
    spa.update_at(later).unwrap();
    let mut expected = ACK_7.to_vec();
    expected.extend_from_slice(&CONFIG_REQUEST_7);
    assert_eq!(bench.take_tx(), expected);
    assert!(spa.client().is_communicating());
}

#[test]
fn read_error_aborts_pass() {
    let bench = Bench::new();
    let now = Instant::now();
    let mut spa = registered_spa(&bench, Settings::default(), now);

    bench.serial.borrow_mut().trigger_read_error();
    bench.push_rx(&clear_to_send(7));
    assert_eq!(
        spa.update_at(now),
        Err(Error::Serial {
            kind: embedded_io::ErrorKind::Other
        })
    );
    // the bytes are still there for the next pass
    spa.update_at(now).unwrap();
    assert_eq!(bench.take_tx(), CONFIG_REQUEST_7.to_vec());
}

#[test]
fn write_error_returns_to_receive() {
    let bench = Bench::new();
    let now = Instant::now();
    let mut spa = registered_spa(&bench, Settings::default(), now);

    bench.serial.borrow_mut().trigger_write_error();
    bench.push_rx(&clear_to_send(7));
    assert!(matches!(spa.update_at(now), Err(Error::Serial { .. })));
    assert_eq!(
        bench.take_trace(),
        vec![
            Event::PinHigh,
            Event::DelayUs(80),
            Event::DelayUs(80),
            Event::PinLow
        ]
    );

    // the config request was consumed, the next opportunity moves on
    bench.push_rx(&clear_to_send(7));
    spa.update_at(now).unwrap();
    assert_eq!(bench.take_tx(), FAULT_LOG_REQUEST_7.to_vec());
}

#[test]
fn direction_pin_error() {
    let bench = Bench::new();
    let now = Instant::now();
    let mut spa = registered_spa(&bench, Settings::default(), now);

    *bench.pin_fail.borrow_mut() = true;
    bench.push_rx(&clear_to_send(7));
    assert_eq!(
        spa.update_at(now),
        Err(Error::DirectionPin {
            kind: embedded_hal::digital::ErrorKind::Other
        })
    );
    assert!(bench.take_tx().is_empty());
}
