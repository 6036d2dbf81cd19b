//! Engine configuration supplied by the host application.

use core::time::Duration;

use crate::types::TempScale;

/// Default time without a valid frame before the bus is considered dead.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Default transceiver turnaround delay, about one byte-time at 115200 baud.
pub const DEFAULT_GUARD_DELAY_US: u32 = 80;

/// Configuration for [`Client`](crate::Client) and [`Spa`](crate::Spa).
///
/// ```
/// use balboa_proto::{Settings, TempScale};
/// let settings = Settings::default()
///     .with_display_scale(TempScale::Fahrenheit)
///     .with_baud_rate(115_200);
/// assert_eq!(settings.guard_delay_us, 87);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Scale temperatures are presented in and set-points are given in.
    pub display_scale: Option<TempScale>,
    /// The spa's own scale. Learned from the configuration frame when `None`.
    pub native_scale: Option<TempScale>,
    pub liveness_timeout: Duration,
    /// Delay between switching the transceiver and the first/after the last byte.
    pub guard_delay_us: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_scale: Some(TempScale::Celsius),
            native_scale: None,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            guard_delay_us: DEFAULT_GUARD_DELAY_US,
        }
    }
}

impl Settings {
    pub fn with_display_scale(mut self, scale: TempScale) -> Self {
        self.display_scale = Some(scale);
        self
    }

    /// Force the spa's scale instead of learning it.
    pub fn with_native_scale(mut self, scale: TempScale) -> Self {
        self.native_scale = Some(scale);
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Size the guard delay to one byte-time (start + 8 data + stop bits).
    pub fn with_baud_rate(mut self, baud: u32) -> Self {
        self.guard_delay_us = 10_000_000_u32.div_ceil(baud.max(1));
        self
    }
}
