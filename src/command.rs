//! Commands the application can ask the client to send.

use crate::encoder::OutFrame;
use crate::opcode;
use crate::types::{ClientId, ClockFormat, Hour, Minute};

/// Preference code for the 12/24 hour clock display.
pub const PREF_CLOCK_FORMAT: u8 = 0x02;

/// Things that are switched with the generic toggle message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Toggle {
    Light1,
    Light2,
    Jet1,
    Jet2,
    Jet3,
    Jet4,
    Blower,
    /// Switch between high and low temperature range.
    HighRange,
    /// Switch between ready and rest heating mode.
    HeatMode,
}

impl Toggle {
    /// Item code sent as the toggle parameter.
    pub const fn code(self) -> u8 {
        match self {
            Self::Jet1 => 0x04,
            Self::Jet2 => 0x05,
            Self::Jet3 => 0x06,
            Self::Jet4 => 0x07,
            Self::Blower => 0x0C,
            Self::Light1 => 0x11,
            Self::Light2 => 0x12,
            Self::HighRange => 0x50,
            Self::HeatMode => 0x51,
        }
    }
}

/// A single outgoing request, waiting for the next clear to send.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    SetClock { hour: Hour, minute: Minute },
    /// Set-point in the spa's native wire units.
    SetTemperature(u8),
    SetPreference { code: u8, data: u8 },
    Toggle(Toggle),
}

impl Command {
    pub fn clock_format(format: ClockFormat) -> Self {
        Self::SetPreference {
            code: PREF_CLOCK_FORMAT,
            data: match format {
                ClockFormat::TwelveHour => 0x00,
                ClockFormat::TwentyFourHour => 0x01,
            },
        }
    }

    /// Encode the command as sent by client `id`.
    pub fn to_frame(&self, id: ClientId) -> OutFrame {
        match *self {
            Self::SetClock { hour, minute } => {
                OutFrame::from_client(id, opcode::SET_CLOCK, &[*hour, *minute])
            }
            Self::SetTemperature(raw) => OutFrame::from_client(id, opcode::SET_TEMPERATURE, &[raw]),
            Self::SetPreference { code, data } => {
                OutFrame::from_client(id, opcode::SET_PREFERENCE, &[code, data])
            }
            Self::Toggle(item) => OutFrame::from_client(id, opcode::TOGGLE, &[item.code(), 0x00]),
        }
    }
}
