#![allow(dead_code)]

use std::cell::RefCell;
use std::cmp::min;
use std::rc::Rc;

use balboa_proto::spa::Spa;
use balboa_proto::{OutFrame, Settings};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

/// Everything the driver did to the outside world, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PinHigh,
    PinLow,
    DelayUs(u32),
    Write(Vec<u8>),
    Flush,
}

pub type Trace = Rc<RefCell<Vec<Event>>>;

pub struct SerialInterface {
    rx: Vec<u8>,
    rx_pos: usize,
    pub tx: Vec<u8>,
    do_read_error: bool,
    do_write_error: bool,
    trace: Trace,
}

impl SerialInterface {
    pub fn new(trace: &Trace) -> Rc<RefCell<SerialInterface>> {
        Rc::new(RefCell::new(SerialInterface {
            rx: Vec::new(),
            rx_pos: 0,
            tx: Vec::new(),
            do_read_error: false,
            do_write_error: false,
            trace: Rc::clone(trace),
        }))
    }

    /// Bytes the spa puts on the bus.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    pub fn unread(&self) -> usize {
        self.rx.len() - self.rx_pos
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn trigger_write_error(&mut self) {
        self.do_write_error = true;
    }

    pub fn trigger_read_error(&mut self) {
        self.do_read_error = true;
    }
}

pub struct SerialIOPlane(Rc<RefCell<SerialInterface>>);

impl SerialIOPlane {
    pub fn new(serial_if: &Rc<RefCell<SerialInterface>>) -> SerialIOPlane {
        SerialIOPlane(serial_if.clone())
    }
}

impl ErrorType for SerialIOPlane {
    type Error = ErrorKind;
}

impl Read for SerialIOPlane {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut inner = self.0.borrow_mut();
        if inner.do_read_error {
            inner.do_read_error = false;
            return Err(ErrorKind::Other);
        }
        let old_pos = inner.rx_pos;
        inner.rx_pos = min(old_pos + buf.len(), inner.rx.len());
        let len = inner.rx_pos - old_pos;
        buf[..len].copy_from_slice(&inner.rx[old_pos..inner.rx_pos]);
        Ok(len)
    }
}

impl ReadReady for SerialIOPlane {
    fn read_ready(&mut self) -> Result<bool, ErrorKind> {
        let inner = self.0.borrow();
        Ok(inner.do_read_error || inner.rx_pos < inner.rx.len())
    }
}

impl Write for SerialIOPlane {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        let mut inner = self.0.borrow_mut();
        if inner.do_write_error {
            inner.do_write_error = false;
            return Err(ErrorKind::Other);
        }
        inner.tx.extend_from_slice(buf);
        inner.trace.borrow_mut().push(Event::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        self.0.borrow().trace.borrow_mut().push(Event::Flush);
        Ok(())
    }
}

/// Direction pin recording its transitions.
pub struct RecordingPin {
    trace: Trace,
    pub fail: Rc<RefCell<bool>>,
}

impl digital::ErrorType for RecordingPin {
    type Error = digital::ErrorKind;
}

impl RecordingPin {
    fn record(&mut self, event: Event) -> Result<(), digital::ErrorKind> {
        if *self.fail.borrow() {
            return Err(digital::ErrorKind::Other);
        }
        self.trace.borrow_mut().push(event);
        Ok(())
    }
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(Event::PinLow)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(Event::PinHigh)
    }
}

pub struct RecordingDelay(Trace);

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(Event::DelayUs(ns / 1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().push(Event::DelayUs(us));
    }
}

pub type TestSpa = Spa<SerialIOPlane, RecordingPin, RecordingDelay>;

/// A simulated spa bus with one client attached.
pub struct Bench {
    pub serial: Rc<RefCell<SerialInterface>>,
    pub trace: Trace,
    pub pin_fail: Rc<RefCell<bool>>,
}

impl Bench {
    pub fn new() -> Bench {
        let trace = Trace::default();
        Bench {
            serial: SerialInterface::new(&trace),
            trace,
            pin_fail: Rc::default(),
        }
    }

    pub fn spa(&self, settings: Settings) -> TestSpa {
        let pin = RecordingPin {
            trace: Rc::clone(&self.trace),
            fail: Rc::clone(&self.pin_fail),
        };
        let delay = RecordingDelay(Rc::clone(&self.trace));
        Spa::new(SerialIOPlane::new(&self.serial), pin, delay, settings).unwrap()
    }

    pub fn push_rx(&self, data: &[u8]) {
        self.serial.borrow_mut().push_rx(data);
    }

    pub fn take_tx(&self) -> Vec<u8> {
        self.serial.borrow_mut().take_tx()
    }

    pub fn take_trace(&self) -> Vec<Event> {
        std::mem::take(&mut *self.trace.borrow_mut())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A frame as sent by the spa.
pub fn spa_frame(source: u8, destination: u8, opcode: u8, params: &[u8]) -> Vec<u8> {
    OutFrame::try_new(source, destination, opcode, params)
        .unwrap()
        .as_bytes()
        .to_vec()
}

pub fn new_client_poll() -> Vec<u8> {
    spa_frame(0xFE, 0xBF, 0x00, &[])
}

pub fn assign_id(id: u8) -> Vec<u8> {
    spa_frame(0xFE, 0xBF, 0x02, &[id])
}

pub fn clear_to_send(id: u8) -> Vec<u8> {
    spa_frame(id, 0xBF, 0x06, &[])
}

/// Status broadcast payload with the given raw temperatures and clock.
pub fn status_payload(set_point: u8, current: u8, hour: u8, minute: u8) -> Vec<u8> {
    let mut payload = vec![0u8; 24];
    payload[2] = current;
    payload[3] = hour;
    payload[4] = minute;
    payload[20] = set_point;
    payload
}

pub fn status(payload: &[u8]) -> Vec<u8> {
    spa_frame(0xFF, 0xAF, 0x13, payload)
}

/// Configuration response; the destination byte carries the scale and
/// clock format bits.
pub fn config_response(id: u8, flags: u8) -> Vec<u8> {
    spa_frame(id, flags, 0x2E, &[0x05, 0x00, 0x01, 0x80, 0x00, 0x00])
}

pub fn fault_log_response(id: u8, code: u8) -> Vec<u8> {
    spa_frame(id, 0xBF, 0x28, &[0x0C, 0x02, code, 0x01, 0x0A, 0x1E])
}

pub fn filter_settings_response(id: u8) -> Vec<u8> {
    spa_frame(id, 0xBF, 0x23, &[20, 0, 2, 0, 0x80 | 8, 0, 1, 30])
}
