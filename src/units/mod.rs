// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit and value conversion helpers.
//!
//! Temperature scale conversion, watt-minute energy counters with a
//! user-resettable offset, and decimal formatting for displayed values.

mod energy;

pub use energy::EnergyMeter;

/// Watt-minutes in one kilowatt-hour.
pub const WATT_MINUTES_PER_KWH: f64 = 60_000.0;

/// Converts Celsius to Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Converts Fahrenheit to Celsius.
#[must_use]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Rounds to the given number of decimals.
#[must_use]
pub fn round_to(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(i32::from(decimals));
    (value * factor).round() / factor
}

/// Formats a value with a fixed number of decimals.
#[must_use]
pub fn format_decimal(value: f64, decimals: u8) -> String {
    format!("{value:.prec$}", prec = usize::from(decimals))
}

/// Converts watt-minutes to kilowatt-hours.
#[must_use]
pub fn watt_minutes_to_kwh(watt_minutes: f64) -> f64 {
    watt_minutes / WATT_MINUTES_PER_KWH
}

/// Number of decimals used to display an energy total.
///
/// Precision shrinks as the total grows.
#[must_use]
pub fn kwh_decimals(kwh: f64) -> u8 {
    let magnitude = kwh.abs();
    if magnitude < 0.01 {
        4
    } else if magnitude < 1.0 {
        3
    } else if magnitude < 10.0 {
        2
    } else {
        1
    }
}

/// Renders an energy total such as `0.512 kWh`.
///
/// # Examples
///
/// ```
/// use shellor_lib::units::format_kwh;
///
/// assert_eq!(format_kwh(0.005), "0.0050 kWh");
/// assert_eq!(format_kwh(0.5), "0.500 kWh");
/// assert_eq!(format_kwh(5.0), "5.00 kWh");
/// assert_eq!(format_kwh(50.0), "50.0 kWh");
/// ```
#[must_use]
pub fn format_kwh(kwh: f64) -> String {
    format!("{} kWh", format_decimal(kwh, kwh_decimals(kwh)))
}
