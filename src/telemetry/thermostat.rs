// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for TRV `info` and `settings` documents.
//!
//! Both documents share the `thermostats` array and the `bat` object, so one
//! struct decodes either.

use serde::Deserialize;

/// A TRV `info` or `settings` document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThermostatReport {
    /// One entry per thermostat channel.
    #[serde(default)]
    pub thermostats: Vec<ThermostatChannel>,
    /// Battery status.
    #[serde(default)]
    pub bat: Option<TrvBattery>,
}

/// State of one thermostat channel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThermostatChannel {
    /// Valve position (0-100).
    #[serde(default)]
    pub pos: Option<f64>,
    /// Target temperature.
    #[serde(default)]
    pub target_t: Option<TrvTarget>,
    /// Measured temperature.
    #[serde(default)]
    pub tmp: Option<TrvTemperature>,
}

/// Thermostat setpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrvTarget {
    /// Whether the setpoint is active.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Setpoint value.
    #[serde(default)]
    pub value: Option<f64>,
    /// Unit of `value` (`C` or `F`).
    #[serde(default)]
    pub units: Option<String>,
}

/// Measured temperature.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrvTemperature {
    /// Reading.
    #[serde(default)]
    pub value: Option<f64>,
    /// Unit of `value` (`C` or `F`).
    #[serde(default)]
    pub units: Option<String>,
    /// Whether the sensor reading is valid.
    #[serde(default)]
    pub is_valid: Option<bool>,
}

/// Battery status.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrvBattery {
    /// Charge in percent.
    #[serde(default)]
    pub value: Option<f64>,
    /// Battery voltage.
    #[serde(default)]
    pub voltage: Option<f64>,
}

impl ThermostatReport {
    /// Returns the entry of a channel.
    #[must_use]
    pub fn channel(&self, channel: u8) -> Option<&ThermostatChannel> {
        self.thermostats.get(usize::from(channel))
    }
}

impl TrvTemperature {
    /// Returns the reading in Celsius, or `None` when invalid.
    #[must_use]
    pub fn celsius(&self) -> Option<f64> {
        if self.is_valid == Some(false) {
            return None;
        }
        let value = self.value?;
        Some(if is_fahrenheit(self.units.as_deref()) {
            crate::units::fahrenheit_to_celsius(value)
        } else {
            value
        })
    }
}

impl TrvTarget {
    /// Returns the setpoint in Celsius.
    #[must_use]
    pub fn celsius(&self) -> Option<f64> {
        let value = self.value?;
        Some(if is_fahrenheit(self.units.as_deref()) {
            crate::units::fahrenheit_to_celsius(value)
        } else {
            value
        })
    }
}

fn is_fahrenheit(units: Option<&str>) -> bool {
    units.is_some_and(|u| u.eq_ignore_ascii_case("F"))
}
