// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static device-type catalog.

use std::fmt;

use crate::error::Error;
use crate::manager::DeviceConfig;
use crate::state::StateKey;

use super::Behavior;
use super::behaviors::{
    AddonHumidity, AddonSwitch, AddonTemperature, Battery, Contact, EmeterExtras, FlagSensor, Gas, Health,
    Hygrometer, Illuminance, Input, Light, Metered, Roller, Switch, Thermometer, Thermostat,
};

/// Builds the behavior chain of a model, most specific first.
pub type BuildChain = fn(&DeviceConfig) -> Vec<Box<dyn Behavior>>;

/// One supported device type.
pub struct CatalogEntry {
    /// Device-type tag used in configuration.
    pub tag: &'static str,
    /// Human-readable model name.
    pub name: &'static str,
    /// Rides on a host device instead of having its own address.
    pub addon: bool,
    /// Behavior chain factory.
    pub build: BuildChain,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("addon", &self.addon)
            .finish_non_exhaustive()
    }
}

const fn entry(tag: &'static str, name: &'static str, build: BuildChain) -> CatalogEntry {
    CatalogEntry {
        tag,
        name,
        addon: false,
        build,
    }
}

const fn addon(tag: &'static str, name: &'static str, build: BuildChain) -> CatalogEntry {
    CatalogEntry {
        tag,
        name,
        addon: true,
        build,
    }
}

/// Every supported device type.
pub static CATALOG: &[CatalogEntry] = &[
    entry("shelly1", "Shelly 1", relay),
    entry("shelly1pm", "Shelly 1PM", metered_relay),
    entry("shelly1l", "Shelly 1L", metered_relay),
    entry("shellyswitch25-relay", "Shelly 2.5 (relay)", metered_relay),
    entry("shellyplug", "Shelly Plug", plug),
    entry("shellyplug-s", "Shelly Plug S", plug),
    entry("shellyuni", "Shelly UNI", relay),
    entry("shellyswitch25-roller", "Shelly 2.5 (roller)", roller),
    entry("shellyroller", "Shelly 2 (roller)", roller),
    entry("shellyem", "Shelly EM", emeter),
    entry("shellyem3", "Shelly 3EM", emeter),
    entry("shellydimmer", "Shelly Dimmer", dimmer),
    entry("shellyvintage", "Shelly Vintage", vintage),
    entry("shellyduo", "Shelly Duo", duo),
    entry("shellybulb-color", "Shelly Bulb (color)", bulb_color),
    entry("shellybulb-white", "Shelly Bulb (white)", bulb_white),
    entry("shellyrgbw2-color", "Shelly RGBW2 (color)", rgbw2_color),
    entry("shellyrgbw2-white", "Shelly RGBW2 (white)", rgbw2_white),
    entry("shellybutton1", "Shelly Button1", button),
    entry("shellyix3", "Shelly i3", ix3),
    entry("shellyht", "Shelly H&T", ht),
    entry("shellydw2", "Shelly Door/Window 2", dw2),
    entry("shellyflood", "Shelly Flood", flood),
    entry("shellymotion", "Shelly Motion", motion),
    entry("shellysmoke", "Shelly Smoke", smoke),
    entry("shellygas", "Shelly Gas", gas),
    entry("shellytrv", "Shelly TRV", trv),
    addon("addon-temperature", "Add-on temperature probe", addon_temperature),
    addon("addon-humidity", "Add-on humidity probe", addon_humidity),
    addon("addon-switch", "Add-on detached switch", addon_switch),
];

/// Looks up a device type.
///
/// # Errors
///
/// Returns `Error::UnknownDeviceType` if no entry carries `tag`.
pub fn lookup(tag: &str) -> Result<&'static CatalogEntry, Error> {
    CATALOG
        .iter()
        .find(|entry| entry.tag == tag)
        .ok_or_else(|| Error::UnknownDeviceType(tag.to_string()))
}

fn relay(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Switch::new(config.channel)),
        Box::new(Input::new(config.channel)),
        Box::new(Health::new()),
    ]
}

fn metered_relay(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("relay", config.channel)),
        Box::new(Switch::new(config.channel)),
        Box::new(Input::new(config.channel)),
        Box::new(Health::new()),
    ]
}

fn plug(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("relay", config.channel)),
        Box::new(Switch::new(config.channel)),
        Box::new(Health::new()),
    ]
}

fn roller(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("roller", config.channel)),
        Box::new(Roller::new(config.channel)),
        Box::new(Input::new(config.channel)),
        Box::new(Health::new()),
    ]
}

// The EM has a single contactor relay regardless of the metered channel.
fn emeter(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("emeter", config.channel)),
        Box::new(EmeterExtras::new(config.channel)),
        Box::new(Switch::new(0)),
        Box::new(Health::new()),
    ]
}

fn dimmer(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("light", config.channel)),
        Box::new(Light::new("light", config.channel, None)),
        Box::new(Input::new(config.channel)),
        Box::new(Health::new()),
    ]
}

fn vintage(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Light::new("light", config.channel, None)),
        Box::new(Health::new()),
    ]
}

fn duo(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("light", config.channel)),
        Box::new(Light::new("light", config.channel, None).with_temperature()),
        Box::new(Health::new()),
    ]
}

fn bulb_color(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Light::new("light", config.channel, Some("color"))),
        Box::new(Health::new()),
    ]
}

fn bulb_white(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Light::new("light", config.channel, Some("white")).with_temperature()),
        Box::new(Health::new()),
    ]
}

fn rgbw2_color(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("color", config.channel)),
        Box::new(Light::new("color", config.channel, Some("color"))),
        Box::new(Input::new(config.channel)),
        Box::new(Health::new()),
    ]
}

fn rgbw2_white(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Metered::new("white", config.channel)),
        Box::new(Light::new("white", config.channel, None)),
        Box::new(Input::new(config.channel)),
        Box::new(Health::new()),
    ]
}

fn button(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Input::new(config.channel)),
        Box::new(Battery::new()),
        Box::new(Health::new()),
    ]
}

fn ix3(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![Box::new(Input::new(config.channel)), Box::new(Health::new())]
}

fn ht(_config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Thermometer::new()),
        Box::new(Hygrometer::new()),
        Box::new(Battery::new()),
        Box::new(Health::new()),
    ]
}

fn dw2(_config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Contact::new()),
        Box::new(Illuminance::new()),
        Box::new(Thermometer::new()),
        Box::new(Battery::new()),
        Box::new(Health::new()),
    ]
}

fn flood(_config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(FlagSensor::new("flood", "sensor/flood", StateKey::Flood)),
        Box::new(Thermometer::new()),
        Box::new(Battery::new()),
        Box::new(Health::new()),
    ]
}

fn motion(_config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(FlagSensor::new("motion", "sensor/motion", StateKey::Motion)),
        Box::new(FlagSensor::new("vibration", "sensor/vibration", StateKey::Vibration)),
        Box::new(Illuminance::new()),
        Box::new(Battery::new()),
        Box::new(Health::new()),
    ]
}

fn smoke(_config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(FlagSensor::new("smoke", "sensor/smoke", StateKey::Smoke)),
        Box::new(Thermometer::new()),
        Box::new(Battery::new()),
        Box::new(Health::new()),
    ]
}

fn gas(_config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![Box::new(Gas::new()), Box::new(Health::new())]
}

fn trv(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![
        Box::new(Thermostat::new(config.channel, config.temperature)),
        Box::new(Health::new()),
    ]
}

fn addon_temperature(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![Box::new(AddonTemperature::new(config.channel, config.probe_id.clone()))]
}

fn addon_humidity(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![Box::new(AddonHumidity::new(config.channel, config.probe_id.clone()))]
}

fn addon_switch(config: &DeviceConfig) -> Vec<Box<dyn Behavior>> {
    vec![Box::new(AddonSwitch::new(config.channel))]
}
