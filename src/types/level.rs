// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded level types used by light, roller and valve commands.
//!
//! Commands coming from the host are clamped into range before encoding,
//! so these types offer a `clamped` constructor next to the checked one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A percentage in the range 0-100.
///
/// Used for brightness, gain, roller position and valve position.
///
/// # Examples
///
/// ```
/// use shellor_lib::types::Percent;
///
/// assert_eq!(Percent::clamped(150).value(), 100);
/// assert_eq!(Percent::clamped(-3).value(), 0);
/// assert!(Percent::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Percent(u8);

impl Percent {
    /// 0%.
    pub const MIN: Self = Self(0);

    /// 100%.
    pub const MAX: Self = Self(100);

    /// Creates a percentage.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a percentage, clamping to 0-100.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(value: i64) -> Self {
        // Safe: clamped to 0..=100 first
        Self(value.clamp(0, 100) as u8)
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// An 8-bit color channel level (0-255).
///
/// # Examples
///
/// ```
/// use shellor_lib::types::ChannelLevel;
///
/// assert_eq!(ChannelLevel::clamped(300).value(), 255);
/// assert_eq!(ChannelLevel::clamped(-1).value(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ChannelLevel(u8);

impl ChannelLevel {
    /// Creates a channel level, clamping to 0-255.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 255) as u8)
    }

    /// Returns the level.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for ChannelLevel {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// White color temperature in Kelvin, limited to what the bulbs accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorTemperature(u16);

impl ColorTemperature {
    /// Warmest supported temperature.
    pub const WARMEST: u16 = 2700;

    /// Coolest supported temperature.
    pub const COOLEST: u16 = 6500;

    /// Creates a color temperature, clamping to 2700-6500 K.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(kelvin: i64) -> Self {
        Self(kelvin.clamp(i64::from(Self::WARMEST), i64::from(Self::COOLEST)) as u16)
    }

    /// Returns the temperature in Kelvin.
    #[must_use]
    pub const fn kelvin(&self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_valid_values() {
        for v in 0..=100 {
            assert_eq!(Percent::new(v).unwrap().value(), v);
        }
        assert!(Percent::new(101).is_err());
    }

    #[test]
    fn percent_clamped() {
        assert_eq!(Percent::clamped(50).value(), 50);
        assert_eq!(Percent::clamped(1000).value(), 100);
        assert_eq!(Percent::clamped(-20).value(), 0);
    }

    #[test]
    fn percent_display() {
        assert_eq!(Percent::clamped(75).to_string(), "75%");
    }

    #[test]
    fn channel_level_clamped() {
        assert_eq!(ChannelLevel::clamped(128).value(), 128);
        assert_eq!(ChannelLevel::clamped(256).value(), 255);
        assert_eq!(ChannelLevel::clamped(i64::MIN).value(), 0);
    }

    #[test]
    fn color_temperature_clamped() {
        assert_eq!(ColorTemperature::clamped(1000).kelvin(), 2700);
        assert_eq!(ColorTemperature::clamped(4000).kelvin(), 4000);
        assert_eq!(ColorTemperature::clamped(9000).kelvin(), 6500);
    }
}
