// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light control commands.
//!
//! Lights take a JSON document on `<prefix>/<channel>/set`, where the prefix
//! is `light` for dimmers and white bulbs, and `color` or `white` for RGBW
//! devices. Only the fields being changed are sent.

use serde::Serialize;

use crate::command::Command;
use crate::types::{ChannelLevel, ColorTemperature, Percent, PowerState};

/// Body of a light `set` command.
///
/// # Examples
///
/// ```
/// use shellor_lib::command::LightSet;
/// use shellor_lib::types::{Percent, PowerState};
///
/// let body = LightSet::turn(PowerState::On).with_brightness(Percent::clamped(75));
/// assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"turn":"on","brightness":75}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    turn: Option<PowerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gain: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    red: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    green: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blue: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    white: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temp: Option<u16>,
}

impl LightSet {
    /// Creates a body that only switches the light.
    #[must_use]
    pub fn turn(state: PowerState) -> Self {
        Self {
            turn: Some(state),
            ..Self::default()
        }
    }

    /// Requests a mode change (`color` or `white`).
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Sets the white brightness.
    #[must_use]
    pub fn with_brightness(mut self, level: Percent) -> Self {
        self.brightness = Some(level.value());
        self
    }

    /// Sets the color gain.
    #[must_use]
    pub fn with_gain(mut self, level: Percent) -> Self {
        self.gain = Some(level.value());
        self
    }

    /// Sets the RGBW channels.
    #[must_use]
    pub fn with_rgbw(
        mut self,
        red: ChannelLevel,
        green: ChannelLevel,
        blue: ChannelLevel,
        white: ChannelLevel,
    ) -> Self {
        self.red = Some(red.value());
        self.green = Some(green.value());
        self.blue = Some(blue.value());
        self.white = Some(white.value());
        self
    }

    /// Sets the white color temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: ColorTemperature) -> Self {
        self.temp = Some(temperature.kelvin());
        self
    }
}

/// Command to change a light channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightCommand {
    prefix: &'static str,
    channel: u8,
    body: LightSet,
}

impl LightCommand {
    /// Creates a light command for `<prefix>/<channel>/set`.
    #[must_use]
    pub fn new(prefix: &'static str, channel: u8, body: LightSet) -> Self {
        Self {
            prefix,
            channel,
            body,
        }
    }

    /// Returns the command body.
    #[must_use]
    pub fn body(&self) -> &LightSet {
        &self.body
    }
}

impl Command for LightCommand {
    fn topic_suffix(&self) -> String {
        format!("{}/{}/set", self.prefix, self.channel)
    }

    fn payload(&self) -> String {
        // Only plain integers, strings and enums; serialization cannot fail
        serde_json::to_string(&self.body).unwrap_or_default()
    }
}
