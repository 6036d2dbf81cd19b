//! I/O driver tying a [`Client`] to a half-duplex serial line.
//!
//! The serial port is anything implementing the blocking `embedded-io`
//! traits. The transceiver's direction line is an `embedded-hal` output pin,
//! driven high while transmitting.

use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_io::{Read, ReadReady, Write};
use log::trace;
use snafu::Snafu;

use crate::client::Client;
use crate::decode::SpaState;
use crate::encoder::OutFrame;
use crate::settings::Settings;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Serial port error: {:?}", kind))]
    Serial { kind: embedded_io::ErrorKind },
    #[snafu(display("Direction pin error: {:?}", kind))]
    DirectionPin { kind: digital::ErrorKind },
}

fn serial_error<E: embedded_io::Error>(err: E) -> Error {
    Error::Serial { kind: err.kind() }
}

fn pin_error<E: digital::Error>(err: E) -> Error {
    Error::DirectionPin { kind: err.kind() }
}

type Listener = Box<dyn FnMut(&SpaState)>;

/// A spa client attached to a serial port.
///
/// Call [`update()`](Self::update) from the application's main loop, often
/// enough that the spa's clear to send is answered in time.
pub struct Spa<S, D, T> {
    serial: S,
    direction: D,
    delay: T,
    client: Client,
    guard_delay_us: u32,
    listeners: Vec<Listener>,
}

impl<S, D, T> Spa<S, D, T>
where
    S: Read + ReadReady + Write,
    D: OutputPin,
    T: DelayNs,
{
    /// Takes ownership of the port and the direction pin. The pin is set to
    /// receive.
    pub fn new(serial: S, mut direction: D, delay: T, settings: Settings) -> Result<Self, Error> {
        direction.set_low().map_err(pin_error)?;
        Ok(Self {
            serial,
            direction,
            delay,
            guard_delay_us: settings.guard_delay_us,
            client: Client::new(settings, Instant::now()),
            listeners: Vec::new(),
        })
    }

    /// Register a callback run at the end of every [`update()`](Self::update).
    pub fn add_listener(&mut self, listener: impl FnMut(&SpaState) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Run one processing pass.
    pub fn update(&mut self) -> Result<(), Error> {
        self.update_at(Instant::now())
    }

    /// Run one processing pass at the given time.
    ///
    /// Reads every byte currently available, answers the spa where needed
    /// and then runs the listeners.
    pub fn update_at(&mut self, now: Instant) -> Result<(), Error> {
        self.client.check_liveness(now);

        let mut buf = [0u8; 1];
        while self.serial.read_ready().map_err(serial_error)? {
            let len = self.serial.read(&mut buf).map_err(serial_error)?;
            if len == 0 {
                break;
            }
            if let Some(reply) = self.client.receive_byte(buf[0], now) {
                self.transmit(&reply)?;
            }
        }

        let state = self.client.state();
        for listener in self.listeners.iter_mut() {
            listener(state);
        }
        Ok(())
    }

    fn transmit(&mut self, frame: &OutFrame) -> Result<(), Error> {
        trace!("TX {:02X?}", frame.as_bytes());
        self.direction.set_high().map_err(pin_error)?;
        self.delay.delay_us(self.guard_delay_us);
        let written = self
            .serial
            .write_all(frame.as_bytes())
            .and_then(|_| self.serial.flush())
            .map_err(serial_error);
        // back to receive even if the write failed
        self.delay.delay_us(self.guard_delay_us);
        self.direction.set_low().map_err(pin_error)?;
        written
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Access to the command API.
    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Give back the port and the pin.
    pub fn release(self) -> (S, D, T) {
        (self.serial, self.direction, self.delay)
    }
}

/// Direction pin for transceivers switching direction by themselves.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoDirectionPin;

impl digital::ErrorType for NoDirectionPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoDirectionPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Guard delay by sleeping the current thread.
#[derive(Debug, Default, Copy, Clone)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(core::time::Duration::from_nanos(ns.into()));
    }
}
