//! Temperature scale handling.
//!
//! The spa reports temperatures in its native scale: whole degrees when it
//! runs in Fahrenheit, half degrees (value × 2) when it runs in Celsius. The
//! application may want them in either scale. Conversions go through Celsius.

use crate::types::TempScale;

/// Lowest and highest set-point accepted from the application, per display scale.
pub const MIN_CELSIUS: f32 = 7.0;
pub const MAX_CELSIUS: f32 = 40.0;
pub const MIN_FAHRENHEIT: f32 = 45.0;
pub const MAX_FAHRENHEIT: f32 = 104.0;

/// Raw value of the current temperature field while the spa has no reading.
pub const UNAVAILABLE: u8 = 0xFF;

/// The spa's native scale and the application's display scale, either of
/// which may not be known yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Scales {
    pub native: Option<TempScale>,
    pub display: Option<TempScale>,
}

pub fn fahrenheit_to_celsius(f: f32) -> f32 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(c: f32) -> f32 {
    (c * 9.0 / 5.0) + 32.0
}

/// Whether `value`, expressed in `scale`, is an acceptable set-point.
pub fn in_range(value: f32, scale: TempScale) -> bool {
    match scale {
        TempScale::Celsius => (MIN_CELSIUS..=MAX_CELSIUS).contains(&value),
        TempScale::Fahrenheit => (MIN_FAHRENHEIT..=MAX_FAHRENHEIT).contains(&value),
    }
}

/// Raw wire value in the spa's native scale to degrees Celsius.
pub fn from_native(raw: u8, native: TempScale) -> f32 {
    match native {
        TempScale::Celsius => f32::from(raw) / 2.0,
        TempScale::Fahrenheit => fahrenheit_to_celsius(f32::from(raw)),
    }
}

/// Degrees Celsius to the raw wire value in the spa's native scale.
pub fn to_native(celsius: f32, native: TempScale) -> u8 {
    let raw = match native {
        TempScale::Celsius => celsius * 2.0,
        TempScale::Fahrenheit => celsius_to_fahrenheit(celsius),
    };
    // float to int casts saturate
    raw.round() as u8
}

/// Degrees Celsius to the application's scale.
pub fn to_display(celsius: f32, display: TempScale) -> f32 {
    match display {
        TempScale::Celsius => celsius,
        TempScale::Fahrenheit => celsius_to_fahrenheit(celsius),
    }
}

/// A value in the application's scale to degrees Celsius.
pub fn from_display(value: f32, display: TempScale) -> f32 {
    match display {
        TempScale::Celsius => value,
        TempScale::Fahrenheit => fahrenheit_to_celsius(value),
    }
}
