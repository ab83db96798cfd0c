// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for device control.
//!
//! - [`PowerState`] - On/Off/Toggle for switchable outputs
//! - [`RelayReport`] - Values reported on relay status topics
//! - [`Percent`] - Brightness, gain and positions (0-100)
//! - [`ChannelLevel`] - 8-bit color channel levels (0-255)
//! - [`ColorTemperature`] - White temperature in Kelvin
//! - [`TemperatureConversion`] / [`TemperatureSettings`] - Temperature display preferences

mod level;
mod power;
mod temperature;

pub use level::{ChannelLevel, ColorTemperature, Percent};
pub use power::{PowerState, RelayReport};
pub use temperature::{TemperatureConversion, TemperatureSettings, TemperatureUnit};
