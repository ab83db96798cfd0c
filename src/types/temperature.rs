// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature unit preferences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::units;

/// Temperature scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Returns the display suffix, e.g. `°C`.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// How a raw reading is turned into the displayed temperature.
///
/// The first two variants keep the device's native scale, the last two
/// convert between scales.
///
/// # Examples
///
/// ```
/// use shellor_lib::types::TemperatureConversion;
///
/// let conv: TemperatureConversion = "C->F".parse().unwrap();
/// assert_eq!(conv, TemperatureConversion::CelsiusToFahrenheit);
/// assert_eq!(conv.to_string(), "C->F");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TemperatureConversion {
    /// Native Celsius, shown as Celsius.
    #[default]
    Celsius,
    /// Native Fahrenheit, shown as Fahrenheit.
    Fahrenheit,
    /// Native Celsius, shown as Fahrenheit.
    CelsiusToFahrenheit,
    /// Native Fahrenheit, shown as Celsius.
    FahrenheitToCelsius,
}

impl TemperatureConversion {
    /// Returns the configuration tag for this conversion.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
            Self::CelsiusToFahrenheit => "C->F",
            Self::FahrenheitToCelsius => "F->C",
        }
    }

    /// Scale the raw reading is reported in.
    #[must_use]
    pub const fn source_unit(&self) -> TemperatureUnit {
        match self {
            Self::Celsius | Self::CelsiusToFahrenheit => TemperatureUnit::Celsius,
            Self::Fahrenheit | Self::FahrenheitToCelsius => TemperatureUnit::Fahrenheit,
        }
    }

    /// Scale the displayed value is expressed in.
    #[must_use]
    pub const fn display_unit(&self) -> TemperatureUnit {
        match self {
            Self::Celsius | Self::FahrenheitToCelsius => TemperatureUnit::Celsius,
            Self::Fahrenheit | Self::CelsiusToFahrenheit => TemperatureUnit::Fahrenheit,
        }
    }

    /// Converts a raw reading into the display scale (no offset applied).
    #[must_use]
    pub fn convert(&self, raw: f64) -> f64 {
        match self {
            Self::Celsius | Self::Fahrenheit => raw,
            Self::CelsiusToFahrenheit => units::celsius_to_fahrenheit(raw),
            Self::FahrenheitToCelsius => units::fahrenheit_to_celsius(raw),
        }
    }
}

impl fmt::Display for TemperatureConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureConversion {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Self::Celsius),
            "F" => Ok(Self::Fahrenheit),
            "C->F" => Ok(Self::CelsiusToFahrenheit),
            "F->C" => Ok(Self::FahrenheitToCelsius),
            _ => Err(ValueError::InvalidTemperatureConversion(s.to_string())),
        }
    }
}

impl TryFrom<String> for TemperatureConversion {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TemperatureConversion> for String {
    fn from(value: TemperatureConversion) -> Self {
        value.as_str().to_string()
    }
}

/// Per-device temperature display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSettings {
    /// Scale conversion applied to raw readings.
    pub conversion: TemperatureConversion,
    /// Additive calibration offset, in the display scale.
    pub offset: f64,
    /// Number of decimals in the rendered value.
    pub decimals: u8,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            conversion: TemperatureConversion::default(),
            offset: 0.0,
            decimals: 1,
        }
    }
}

impl TemperatureSettings {
    /// Maximum number of decimals accepted in configuration.
    pub const MAX_DECIMALS: u8 = 4;

    /// Applies conversion and offset to a raw reading.
    #[must_use]
    pub fn apply(&self, raw: f64) -> f64 {
        self.conversion.convert(raw) + self.offset
    }

    /// Decimals used for display, capped at [`Self::MAX_DECIMALS`].
    #[must_use]
    pub fn display_decimals(&self) -> u8 {
        self.decimals.min(Self::MAX_DECIMALS)
    }

    /// Renders a display-scale value with decimals and unit suffix.
    #[must_use]
    pub fn render(&self, value: f64) -> String {
        format!(
            "{} {}",
            units::format_decimal(value, self.display_decimals()),
            self.conversion.display_unit().suffix()
        )
    }
}
