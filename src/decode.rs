//! Payload decoders.
//!
//! Every payload field is described by a [`Field`] (byte offset, mask and
//! shift) so the wire layout can be audited in one place. Offsets are
//! relative to the first byte after the opcode.

use log::{debug, warn};

use crate::nom_parser;
use crate::temperature::{self, Scales, UNAVAILABLE};
use crate::types::{ClockFormat, TempScale};

/// Location of a value inside a payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    pub offset: usize,
    pub mask: u8,
    pub shift: u8,
}

impl Field {
    /// A whole byte.
    pub const fn byte(offset: usize) -> Self {
        Self {
            offset,
            mask: 0xFF,
            shift: 0,
        }
    }

    /// The bits selected by `mask`, shifted down by `shift`.
    pub const fn bits(offset: usize, mask: u8, shift: u8) -> Self {
        Self {
            offset,
            mask,
            shift,
        }
    }

    /// A single bit.
    pub const fn bit(offset: usize, bit: u8) -> Self {
        Self {
            offset,
            mask: 1 << bit,
            shift: bit,
        }
    }

    /// Extract the field, `None` if the payload is too short.
    pub fn get(&self, data: &[u8]) -> Option<u8> {
        data.get(self.offset).map(|b| (b & self.mask) >> self.shift)
    }

    /// Extract the field as a flag, set when non-zero.
    pub fn flag(&self, data: &[u8]) -> Option<bool> {
        self.get(data).map(|v| v != 0)
    }
}

/// Status broadcast layout.
pub mod status {
    use super::Field;

    pub const CURRENT_TEMP: Field = Field::byte(2);
    pub const HOUR: Field = Field::byte(3);
    pub const MINUTE: Field = Field::byte(4);
    pub const HEATING_MODE: Field = Field::byte(5);
    pub const HEATING: Field = Field::bit(10, 4);
    pub const HIGH_RANGE: Field = Field::bit(10, 2);
    pub const JET1: Field = Field::bit(11, 1);
    pub const JET2: Field = Field::bit(11, 3);
    pub const JET3: Field = Field::bit(11, 5);
    pub const JET4: Field = Field::bit(11, 7);
    pub const CIRCULATION: Field = Field::bit(13, 1);
    pub const BLOWER: Field = Field::bit(13, 2);
    pub const LIGHT1: Field = Field::bits(14, 0x03, 0);
    pub const LIGHT2: Field = Field::bits(14, 0x0C, 2);
    pub const SET_POINT: Field = Field::byte(20);

    pub const MIN_LEN: usize = SET_POINT.offset + 1;

    /// Heating mode value while resting.
    pub const REST_MODE: u8 = 0x01;
    /// Light field value while the light is on.
    pub const LIGHT_ON: u8 = 0x03;
}

/// Configuration response layout.
pub mod config {
    use super::Field;

    pub const PUMPS: [Field; 6] = [
        Field::bits(0, 0x03, 0),
        Field::bits(0, 0x0C, 2),
        Field::bits(0, 0x30, 4),
        Field::bits(0, 0xC0, 6),
        Field::bits(1, 0x03, 0),
        Field::bits(1, 0xC0, 6),
    ];
    pub const LIGHTS: [Field; 2] = [Field::bits(2, 0x03, 0), Field::bits(2, 0x0C, 2)];
    pub const CIRCULATION: Field = Field::bit(3, 7);
    pub const BLOWER: Field = Field::bits(3, 0x03, 0);
    pub const MISTER: Field = Field::bits(4, 0x30, 4);
    pub const AUX1: Field = Field::bit(4, 0);
    pub const AUX2: Field = Field::bit(4, 1);

    /// Scale and clock flags are carried in the header's destination byte,
    /// not in the payload.
    pub const TEMP_SCALE: Field = Field::bit(0, 0);
    pub const CLOCK_FORMAT: Field = Field::bit(0, 1);
}

/// Filter settings response layout, second cycle. The first cycle is four
/// plain bytes.
pub const FILTER2_ENABLED: Field = Field::bit(0, 7);
pub const FILTER2_HOUR: Field = Field::bits(0, 0x7F, 0);

/// Latest live state of the spa, in display units.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpaState {
    /// Set-point, `None` until a status with known scales was decoded.
    pub target_temp: Option<f32>,
    /// Water temperature, `None` while the spa has no reading.
    pub current_temp: Option<f32>,
    pub hour: u8,
    pub minute: u8,
    pub rest_mode: bool,
    pub heating: bool,
    pub high_range: bool,
    pub jets: [bool; 4],
    pub circulation: bool,
    pub blower: bool,
    pub light1: bool,
    pub light2: bool,
}

/// Equipment present on the spa, as reported by the configuration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaConfig {
    /// Number of speeds per pump, 0 if absent.
    pub pumps: [u8; 6],
    /// Light presence per light, 0 if absent.
    pub lights: [u8; 2],
    pub circulation: bool,
    pub blower: bool,
    pub mister: bool,
    pub aux1: bool,
    pub aux2: bool,
    pub temp_scale: TempScale,
    pub clock_format: ClockFormat,
}

/// One entry of the spa's fault log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FaultLogEntry {
    pub total_entries: u8,
    pub current_entry: u8,
    pub code: u8,
    pub days_ago: u8,
    pub hour: u8,
    pub minute: u8,
}

impl FaultLogEntry {
    /// Human readable meaning of the fault code, if known.
    pub fn description(&self) -> Option<&'static str> {
        Some(match self.code {
            15 => "Sensors are out of sync",
            16 => "The water flow is low",
            17 => "The water flow has failed",
            18 => "The settings have been reset",
            19 => "Priming Mode",
            20 => "The clock has failed",
            21 => "The settings have been reset",
            22 => "Program memory failure",
            26 => "Sensors are out of sync -- Call for service",
            27 => "The heater is dry",
            28 => "The heater may be dry",
            29 => "The water is too hot",
            30 => "The heater is too hot",
            31 => "Sensor A Fault",
            32 => "Sensor B Fault",
            34 => "A pump may be stuck on",
            35 => "Hot fault",
            36 => "The GFCI test failed",
            37 => "Standby Mode (Hold Mode)",
            _ => return None,
        })
    }
}

/// A filter cycle window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FilterCycle {
    pub enabled: bool,
    pub start_hour: u8,
    pub start_minute: u8,
    pub duration_hours: u8,
    pub duration_minutes: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FilterSettings {
    pub filter1: FilterCycle,
    pub filter2: FilterCycle,
}

/// Decode a status broadcast on top of the `previous` state.
///
/// Returns `None`, and nothing is updated, if the payload is too short.
pub fn decode_status(payload: &[u8], scales: Scales, previous: &SpaState) -> Option<SpaState> {
    use status::*;

    if payload.len() < MIN_LEN {
        debug!("Status payload too short: {} bytes", payload.len());
        return None;
    }
    let mut state = previous.clone();

    match (scales.native, scales.display) {
        (Some(native), Some(display)) => {
            let raw = SET_POINT.get(payload)?;
            let target = temperature::to_display(temperature::from_native(raw, native), display);
            if temperature::in_range(target, display) {
                state.target_temp = Some(target);
            } else {
                warn!("Set-point {:.1}{} out of range, raw 0x{:02X}", target, display, raw);
            }

            let raw = CURRENT_TEMP.get(payload)?;
            if raw != UNAVAILABLE {
                state.current_temp = Some(temperature::to_display(
                    temperature::from_native(raw, native),
                    display,
                ));
            }
        }
        _ => debug!("Temperature scales not known yet, skipping temperatures"),
    }

    state.hour = HOUR.get(payload)?;
    state.minute = MINUTE.get(payload)?;
    state.rest_mode = HEATING_MODE.get(payload)? == REST_MODE;
    state.heating = HEATING.flag(payload)?;
    state.high_range = HIGH_RANGE.flag(payload)?;
    state.jets = [
        JET1.flag(payload)?,
        JET2.flag(payload)?,
        JET3.flag(payload)?,
        JET4.flag(payload)?,
    ];
    state.circulation = CIRCULATION.flag(payload)?;
    state.blower = BLOWER.flag(payload)?;
    state.light1 = LIGHT1.get(payload)? == LIGHT_ON;
    state.light2 = LIGHT2.flag(payload)?;
    Some(state)
}

/// Decode a configuration response. `flags` is the header byte carrying the
/// scale and clock format bits.
pub fn decode_config(flags: u8, payload: &[u8]) -> Option<SpaConfig> {
    use config::*;

    let header = [flags];
    let mut pumps = [0; 6];
    for (pump, field) in pumps.iter_mut().zip(PUMPS.iter()) {
        *pump = field.get(payload)?;
    }
    Some(SpaConfig {
        pumps,
        lights: [LIGHTS[0].get(payload)?, LIGHTS[1].get(payload)?],
        circulation: CIRCULATION.flag(payload)?,
        blower: BLOWER.flag(payload)?,
        mister: MISTER.flag(payload)?,
        aux1: AUX1.flag(payload)?,
        aux2: AUX2.flag(payload)?,
        temp_scale: TempScale::from_bit(TEMP_SCALE.get(&header)?),
        clock_format: ClockFormat::from_bit(CLOCK_FORMAT.get(&header)?),
    })
}

pub fn decode_fault_log(payload: &[u8]) -> Option<FaultLogEntry> {
    nom_parser::fault_log(payload).ok().map(|(_, entry)| entry)
}

pub fn decode_filter_settings(payload: &[u8]) -> Option<FilterSettings> {
    nom_parser::filter_settings(payload)
        .ok()
        .map(|(_, settings)| settings)
}
