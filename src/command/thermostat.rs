// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostatic valve commands.

use crate::command::Command;
use crate::types::Percent;
use crate::units;

/// Command to a TRV channel.
///
/// Setpoints are always sent in Celsius with one decimal.
///
/// # Examples
///
/// ```
/// use shellor_lib::command::{Command, ThermostatCommand};
///
/// let cmd = ThermostatCommand::target_from_fahrenheit(0, 70.0);
/// assert_eq!(cmd.topic_suffix(), "thermostat/0/command/target_t");
/// assert_eq!(cmd.payload(), "21.1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThermostatCommand {
    /// Change the setpoint.
    TargetTemperature {
        /// Thermostat channel.
        channel: u8,
        /// Setpoint in Celsius.
        celsius: f64,
    },
    /// Force the valve opening.
    ValvePosition {
        /// Thermostat channel.
        channel: u8,
        /// Valve opening.
        position: Percent,
    },
}

impl ThermostatCommand {
    /// Creates a setpoint command from a Celsius value.
    #[must_use]
    pub fn target_from_celsius(channel: u8, celsius: f64) -> Self {
        Self::TargetTemperature {
            channel,
            celsius: units::round_to(celsius, 1),
        }
    }

    /// Creates a setpoint command from a Fahrenheit value.
    #[must_use]
    pub fn target_from_fahrenheit(channel: u8, fahrenheit: f64) -> Self {
        Self::target_from_celsius(channel, units::fahrenheit_to_celsius(fahrenheit))
    }
}

impl Command for ThermostatCommand {
    fn topic_suffix(&self) -> String {
        match self {
            Self::TargetTemperature { channel, .. } => {
                format!("thermostat/{channel}/command/target_t")
            }
            Self::ValvePosition { channel, .. } => format!("thermostat/{channel}/command/valve_pos"),
        }
    }

    fn payload(&self) -> String {
        match self {
            Self::TargetTemperature { celsius, .. } => units::format_decimal(*celsius, 1),
            Self::ValvePosition { position, .. } => position.value().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celsius_setpoint_is_rounded_not_truncated() {
        let cmd = ThermostatCommand::target_from_celsius(0, 21.26);
        assert_eq!(cmd.payload(), "21.3");
    }

    #[test]
    fn fahrenheit_setpoint_is_converted() {
        // 72 F = 22.222 C
        assert_eq!(ThermostatCommand::target_from_fahrenheit(0, 72.0).payload(), "22.2");
    }

    #[test]
    fn valve_position_topic() {
        let cmd = ThermostatCommand::ValvePosition {
            channel: 0,
            position: Percent::clamped(55),
        };
        assert_eq!(cmd.topic("shellies/trv"), "shellies/trv/thermostat/0/command/valve_pos");
        assert_eq!(cmd.payload(), "55");
    }
}
