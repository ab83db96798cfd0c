// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composable device behaviors.

mod addon;
mod health;
mod input;
mod light;
mod meter;
mod relay;
mod roller;
mod sensor;
mod thermostat;

pub(crate) use addon::{AddonHumidity, AddonSwitch, AddonTemperature};
pub(crate) use health::Health;
pub(crate) use input::Input;
pub(crate) use light::Light;
pub(crate) use meter::{EmeterExtras, Metered};
pub(crate) use relay::Switch;
pub(crate) use roller::Roller;
pub(crate) use sensor::{Battery, Contact, FlagSensor, Gas, Hygrometer, Illuminance, Thermometer};
pub(crate) use thermostat::Thermostat;

use super::DeviceContext;
use crate::state::StateKey;
use crate::units;

/// Writes a display-scale temperature and its rendered form.
fn set_display_temperature(ctx: &mut DeviceContext<'_>, value: f64) {
    let settings = ctx.config().temperature;
    let decimals = settings.display_decimals();
    ctx.set(StateKey::Temperature, units::round_to(value, decimals));
    ctx.set(StateKey::TemperatureDisplay, settings.render(value));
}

/// Converts a raw reading per the device settings and writes it.
fn apply_temperature(ctx: &mut DeviceContext<'_>, raw: f64) {
    let value = ctx.config().temperature.apply(raw);
    set_display_temperature(ctx, value);
}

/// Applies the humidity offset and writes the result.
fn apply_humidity(ctx: &mut DeviceContext<'_>, raw: f64) {
    let value = (raw + ctx.config().humidity_offset).clamp(0.0, 100.0);
    ctx.set(StateKey::Humidity, units::round_to(value, 1));
}
