// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shelly command definitions.
//!
//! A host issues an [`Action`]; the device model picks the matching typed
//! command and publishes it under the device address.
//!
//! # Available Commands
//!
//! | Command Type | Topic suffix | Payload |
//! |-------------|--------------|---------|
//! | [`RelayCommand`] | `relay/<ch>/command` | `on`, `off`, `toggle` |
//! | [`LightCommand`] | `light/<ch>/set`, `color/<ch>/set`, `white/<ch>/set` | JSON |
//! | [`RollerCommand`] | `roller/<ch>/command`, `roller/<ch>/command/pos` | `open`, `close`, `stop`, `0`-`100` |
//! | [`ThermostatCommand`] | `thermostat/<ch>/command/target_t`, `.../valve_pos` | number |
//! | [`DeviceCommand`] | `command` | `update`, `announce`, `update_fw` |
//!
//! # Examples
//!
//! ```
//! use shellor_lib::command::{Command, RelayCommand};
//! use shellor_lib::types::PowerState;
//!
//! let cmd = RelayCommand::new(0, PowerState::On);
//! assert_eq!(cmd.topic("shellies/test"), "shellies/test/relay/0/command");
//! assert_eq!(cmd.payload(), "on");
//! ```

mod light;
mod power;
mod roller;
mod status;
mod thermostat;

pub use light::{LightCommand, LightSet};
pub use power::RelayCommand;
pub use roller::RollerCommand;
pub use status::DeviceCommand;
pub use thermostat::ThermostatCommand;

use serde::{Deserialize, Serialize};

/// A command that can be published to a Shelly device.
pub trait Command {
    /// Returns the topic below the device address, e.g. `relay/0/command`.
    fn topic_suffix(&self) -> String;

    /// Returns the payload text.
    fn payload(&self) -> String;

    /// Returns the full topic under `address`.
    fn topic(&self, address: &str) -> String {
        format!("{address}/{}", self.topic_suffix())
    }
}

/// A user-issued action, before encoding.
///
/// Numeric arguments are taken as-is and clamped by the device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Turn the output on.
    On,
    /// Turn the output off.
    Off,
    /// Invert the output.
    Toggle,
    /// Set brightness or gain (0-100).
    SetBrightness {
        /// Requested level.
        level: i64,
    },
    /// Set RGBW levels (0-255) and gain (0-100).
    SetColor {
        /// Red level.
        red: i64,
        /// Green level.
        green: i64,
        /// Blue level.
        blue: i64,
        /// White level.
        white: i64,
        /// Gain.
        gain: i64,
    },
    /// Set white color temperature in Kelvin.
    SetColorTemperature {
        /// Requested temperature.
        kelvin: i64,
    },
    /// Open a roller.
    Open,
    /// Close a roller.
    Close,
    /// Stop a moving roller.
    Stop,
    /// Move a roller to a position (0-100).
    SetPosition {
        /// Requested position.
        position: i64,
    },
    /// Set a thermostat setpoint, in the device's display scale.
    SetTargetTemperature {
        /// Requested setpoint.
        value: f64,
    },
    /// Force a valve position (0-100).
    SetValvePosition {
        /// Requested opening.
        position: i64,
    },
    /// Zero the displayed energy total.
    ResetEnergy,
    /// Ask the device to republish its status.
    Update,
    /// Ask the device to announce itself.
    Announce,
    /// Start a firmware update.
    UpdateFirmware,
}

impl Action {
    /// Returns the action name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Toggle => "toggle",
            Self::SetBrightness { .. } => "set_brightness",
            Self::SetColor { .. } => "set_color",
            Self::SetColorTemperature { .. } => "set_color_temperature",
            Self::Open => "open",
            Self::Close => "close",
            Self::Stop => "stop",
            Self::SetPosition { .. } => "set_position",
            Self::SetTargetTemperature { .. } => "set_target_temperature",
            Self::SetValvePosition { .. } => "set_valve_position",
            Self::ResetEnergy => "reset_energy",
            Self::Update => "update",
            Self::Announce => "announce",
            Self::UpdateFirmware => "update_firmware",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
