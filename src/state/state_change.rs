// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State keys, values and change records.
//!
//! A device's state is a map from [`StateKey`] to [`StateValue`]. Every
//! successful write that alters the map yields a [`StateChange`], which is
//! what the host receives in `StateChanged` events.
//!
//! # Examples
//!
//! ```
//! use shellor_lib::state::{DeviceState, StateKey, StateValue};
//!
//! let mut state = DeviceState::new();
//! let change = state.set(StateKey::On, true).unwrap();
//! assert_eq!(change.value, StateValue::Bool(true));
//!
//! // Writing the same value again is not a change
//! assert!(state.set(StateKey::On, true).is_none());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a state field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    /// Output is on.
    On,
    /// Relay tripped on its power limit.
    Overpower,
    /// Device reports itself online.
    Online,
    /// Internal device temperature, in the device's scale.
    DeviceTemperature,
    /// Internal overheating flag.
    Overtemperature,
    /// Instantaneous power in Watts.
    Power,
    /// Displayed energy total in kWh.
    Energy,
    /// Rendered energy total, e.g. `0.512 kWh`.
    EnergyDisplay,
    /// Raw watt-minute counter subtracted from readings.
    EnergyOffset,
    /// Energy fed back to the grid, in kWh.
    ReturnedEnergy,
    /// Line voltage in Volts.
    Voltage,
    /// Line current in Amperes.
    Current,
    /// Power factor (0-1).
    PowerFactor,
    /// Brightness or gain (0-100).
    Brightness,
    /// Red channel (0-255).
    Red,
    /// Green channel (0-255).
    Green,
    /// Blue channel (0-255).
    Blue,
    /// White channel (0-255).
    White,
    /// White color temperature in Kelvin.
    ColorTemperature,
    /// Active light effect index.
    Effect,
    /// Reported light mode (`color` or `white`).
    LightMode,
    /// Roller movement state (`open`, `close`, `stop`).
    RollerState,
    /// Roller position (0-100).
    Position,
    /// Digital input level.
    Input,
    /// Last button event code (`S`, `L`, `SS`, ...).
    InputEvent,
    /// Counter of button events.
    InputEventCount,
    /// Converted temperature in the display scale.
    Temperature,
    /// Rendered temperature, e.g. `21.5 °C`.
    TemperatureDisplay,
    /// Relative humidity in percent.
    Humidity,
    /// Battery charge in percent.
    Battery,
    /// Door/window open.
    Open,
    /// Tilt angle in degrees.
    Tilt,
    /// Vibration detected.
    Vibration,
    /// Illuminance in lux.
    Lux,
    /// Motion detected.
    Motion,
    /// Water detected.
    Flood,
    /// Smoke detected.
    Smoke,
    /// Gas alarm state (`none`, `mild`, `heavy`, `test`).
    Gas,
    /// Gas concentration in ppm.
    GasConcentration,
    /// Thermostat setpoint in the display scale.
    TargetTemperature,
    /// Valve opening (0-100).
    ValvePosition,
    /// Composite status line built from the other fields.
    Status,
}

impl StateKey {
    /// Returns the snake case name of the key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Overpower => "overpower",
            Self::Online => "online",
            Self::DeviceTemperature => "device_temperature",
            Self::Overtemperature => "overtemperature",
            Self::Power => "power",
            Self::Energy => "energy",
            Self::EnergyDisplay => "energy_display",
            Self::EnergyOffset => "energy_offset",
            Self::ReturnedEnergy => "returned_energy",
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::PowerFactor => "power_factor",
            Self::Brightness => "brightness",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::White => "white",
            Self::ColorTemperature => "color_temperature",
            Self::Effect => "effect",
            Self::LightMode => "light_mode",
            Self::RollerState => "roller_state",
            Self::Position => "position",
            Self::Input => "input",
            Self::InputEvent => "input_event",
            Self::InputEventCount => "input_event_count",
            Self::Temperature => "temperature",
            Self::TemperatureDisplay => "temperature_display",
            Self::Humidity => "humidity",
            Self::Battery => "battery",
            Self::Open => "open",
            Self::Tilt => "tilt",
            Self::Vibration => "vibration",
            Self::Lux => "lux",
            Self::Motion => "motion",
            Self::Flood => "flood",
            Self::Smoke => "smoke",
            Self::Gas => "gas",
            Self::GasConcentration => "gas_concentration",
            Self::TargetTemperature => "target_temperature",
            Self::ValvePosition => "valve_position",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Boolean flag.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Measurement.
    Float(f64),
    /// Free text.
    Text(String),
}

impl StateValue {
    /// Returns the boolean, if this is a flag.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the integer, if this is a whole number.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u8> for StateValue {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u16> for StateValue {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A single field update applied to a device state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// The field that changed.
    pub key: StateKey,
    /// Value before the change, if the field was set.
    pub previous: Option<StateValue>,
    /// The new value.
    pub value: StateValue,
}

impl StateChange {
    /// Returns `true` if the field was unset before this change.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.previous.is_none()
    }
}
