//! This module defines range-checked types for bus addresses and clock
//! values, meant to simplify correct usage of the API.

use snafu::{ensure, OptionExt, Snafu};

use core::convert::{TryFrom, TryInto};
use core::fmt;
use core::ops::Deref;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid client id.
    #[snafu(display("Invalid client id"))]
    InvalidClientId,
    /// The value isn't a valid hour of the day.
    #[snafu(display("Invalid hour"))]
    InvalidHour,
    /// The value isn't a valid minute.
    #[snafu(display("Invalid minute"))]
    InvalidMinute,
}

const fn invalid_client_id() -> InvalidClientIdSnafu {
    InvalidClientIdSnafu
}

const fn invalid_hour() -> InvalidHourSnafu {
    InvalidHourSnafu
}

const fn invalid_minute() -> InvalidMinuteSnafu {
    InvalidMinuteSnafu
}

/// Highest client id the spa will hand out.
pub const MAX_CLIENT_ID: u8 = 0x2F;

/// `ClientId` is a range-checked \[1, 0x2F\] integer, the bus address
/// assigned to us by the spa.
///
/// ## Example
/// ```
/// use balboa_proto::ClientId;
/// let id = ClientId::new(0x10).unwrap();
/// assert_eq!(*id, 0x10);
/// assert_eq!(*ClientId::clamped(0x40).unwrap(), 0x2F);
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct ClientId(u8);

impl ClientId {
    /// Create a new client id, checking that it is in \[1, 0x2F\].
    /// # Errors
    /// Returns [`Error::InvalidClientId`] if `id` is out of range.
    pub fn new(id: impl TryInto<u8>) -> Result<Self, Error> {
        let id = id.try_into().ok().with_context(invalid_client_id)?;
        ensure!((1..=MAX_CLIENT_ID).contains(&id), invalid_client_id());
        Ok(Self(id))
    }

    /// Interpret an id proposed by the spa. Ids above [`MAX_CLIENT_ID`]
    /// are clamped, zero means no id was assigned.
    pub const fn clamped(id: u8) -> Option<Self> {
        match id {
            0 => None,
            id if id > MAX_CLIENT_ID => Some(Self(MAX_CLIENT_ID)),
            id => Some(Self(id)),
        }
    }
}

impl Deref for ClientId {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for ClientId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}


/// `Hour` is a range-checked \[0, 23\] hour of the day.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Hour(u8);

impl Hour {
    /// # Errors
    /// Returns [`Error::InvalidHour`] if `hour` is out of range.
    pub fn new(hour: impl TryInto<u8>) -> Result<Self, Error> {
        let hour = hour.try_into().ok().with_context(invalid_hour)?;
        ensure!(hour <= 23, invalid_hour());
        Ok(Self(hour))
    }
}

impl Deref for Hour {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `Minute` is a range-checked \[0, 59\] minute of the hour.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Minute(u8);

impl Minute {
    /// # Errors
    /// Returns [`Error::InvalidMinute`] if `minute` is out of range.
    pub fn new(minute: impl TryInto<u8>) -> Result<Self, Error> {
        let minute = minute.try_into().ok().with_context(invalid_minute)?;
        ensure!(minute <= 59, invalid_minute());
        Ok(Self(minute))
    }
}

impl Deref for Minute {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}


/// Temperature scale, either the one the spa reports in or the one the
/// application wants values expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TempScale {
    Fahrenheit,
    Celsius,
}

impl TempScale {
    /// Decode the single scale bit used on the wire, 0 = Fahrenheit, 1 = Celsius.
    pub const fn from_bit(bit: u8) -> Self {
        if bit & 0x01 == 0 {
            Self::Fahrenheit
        } else {
            Self::Celsius
        }
    }
}

impl fmt::Display for TempScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fahrenheit => write!(f, "°F"),
            Self::Celsius => write!(f, "°C"),
        }
    }
}

/// Clock display format reported by the spa.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClockFormat {
    TwelveHour,
    TwentyFourHour,
}

impl ClockFormat {
    pub const fn from_bit(bit: u8) -> Self {
        if bit & 0x01 == 0 {
            Self::TwelveHour
        } else {
            Self::TwentyFourHour
        }
    }
}
