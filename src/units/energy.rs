// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy counter with a resettable display offset.

use serde::{Deserialize, Serialize};

use super::watt_minutes_to_kwh;

/// Tracks a device-side watt-minute counter and the displayed total.
///
/// Physical counters only grow and cannot be reset remotely. A user reset
/// moves the offset to the latest raw value so the displayed total
/// restarts at zero. When the device reports a value below the offset or
/// below the previous raw value (its counter restarted after a power
/// loss), the offset is rebased so the displayed total continues from the
/// last known value.
///
/// # Examples
///
/// ```
/// use shellor_lib::units::EnergyMeter;
///
/// let mut meter = EnergyMeter::new();
/// meter.update(6_000.0);
/// meter.reset();
/// meter.update(9_000.0);
/// assert!((meter.total_kwh() - 0.05).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyMeter {
    /// Raw counter value subtracted from readings, in watt-minutes.
    offset: f64,
    /// Last raw counter value seen.
    last_raw: Option<f64>,
    /// Last displayed total, in watt-minutes.
    total: f64,
}

impl EnergyMeter {
    /// Creates a meter with no offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a meter from a persisted offset and displayed total.
    #[must_use]
    pub fn restore(offset: f64, total_watt_minutes: f64) -> Self {
        Self {
            offset,
            last_raw: None,
            total: total_watt_minutes,
        }
    }

    /// Feeds a raw counter reading and returns the displayed total in
    /// watt-minutes.
    pub fn update(&mut self, raw: f64) -> f64 {
        let restarted = raw < self.offset || self.last_raw.is_some_and(|last| raw < last);
        if restarted {
            tracing::debug!(
                raw,
                offset = self.offset,
                total = self.total,
                "Energy counter went backwards, rebasing offset"
            );
            self.offset = raw - self.total;
        }
        self.last_raw = Some(raw);
        self.total = raw - self.offset;
        self.total
    }

    /// Zeroes the displayed total.
    pub fn reset(&mut self) {
        if let Some(raw) = self.last_raw {
            self.offset = raw;
        } else {
            // Nothing seen yet: the next reading becomes the new zero.
            self.offset += self.total;
        }
        self.total = 0.0;
    }

    /// Current offset in watt-minutes.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Displayed total in watt-minutes.
    #[must_use]
    pub fn total_watt_minutes(&self) -> f64 {
        self.total
    }

    /// Displayed total in kilowatt-hours.
    #[must_use]
    pub fn total_kwh(&self) -> f64 {
        watt_minutes_to_kwh(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_reading_is_total_without_offset() {
        let mut meter = EnergyMeter::new();
        assert!(approx(meter.update(1_200.0), 1_200.0));
        assert!(approx(meter.total_kwh(), 0.02));
    }

    #[test]
    fn reset_then_update_shows_only_delta() {
        let x = 45_000.0;
        let y = 3_000.0;
        let mut meter = EnergyMeter::new();
        meter.update(x);
        meter.reset();
        assert!(approx(meter.total_watt_minutes(), 0.0));
        assert!(approx(meter.update(x + y), y));
    }

    #[test]
    fn counter_restart_continues_from_displayed_total() {
        // 0.5 kWh displayed, offset 100_000 Wmin.
        let mut meter = EnergyMeter::restore(100_000.0, 30_000.0);
        let shown = meter.update(50.0);
        assert!(approx(shown, 30_000.0));
        assert!(approx(meter.total_kwh(), 0.5));
        // Next reading continues seamlessly.
        assert!(approx(meter.update(110.0), 30_060.0));
    }

    #[test]
    fn counter_drop_below_previous_raw_is_a_restart() {
        let mut meter = EnergyMeter::new();
        meter.update(10_000.0);
        meter.update(12_000.0);
        assert!(approx(meter.update(100.0), 12_000.0));
        assert!(approx(meter.update(700.0), 12_600.0));
    }

    #[test]
    fn reset_before_any_reading_keeps_restored_total_out() {
        let mut meter = EnergyMeter::restore(0.0, 6_000.0);
        meter.reset();
        assert!(approx(meter.total_watt_minutes(), 0.0));
        assert!(approx(meter.offset(), 6_000.0));
    }
}
