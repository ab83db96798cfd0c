// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery-powered sensors publishing under `sensor/`.

use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::decode;
use crate::types::Percent;
use crate::units;

use super::{apply_humidity, apply_temperature};

macro_rules! impl_rule_set {
    ($($ty:ty),+) => {
        $(
            impl RuleSet for $ty {
                fn rules(&self) -> &RuleTable<Self> {
                    &self.table
                }
            }
        )+
    };
}

impl_rule_set!(Battery, Thermometer, Hygrometer, Contact, Illuminance, FlagSensor, Gas);

/// Battery charge on `sensor/battery`.
#[derive(Debug)]
pub(crate) struct Battery {
    table: RuleTable<Self>,
}

impl Battery {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "sensor/battery",
        apply: Self::charge,
    }];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "sensor", 0),
        }
    }

    fn charge(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let charge = decode::parse_integer("battery", payload)?;
        ctx.set(StateKey::Battery, Percent::clamped(charge).value());
        Ok(())
    }
}

impl Behavior for Battery {
    fn name(&self) -> &'static str {
        "battery"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        state
            .integer(StateKey::Battery)
            .map(|charge| format!("battery {charge}%"))
    }
}

/// Ambient temperature on `sensor/temperature`.
#[derive(Debug)]
pub(crate) struct Thermometer {
    table: RuleTable<Self>,
}

impl Thermometer {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "sensor/temperature",
        apply: Self::reading,
    }];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "sensor", 0),
        }
    }

    fn reading(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let raw = decode::parse_float("temperature", payload)?;
        apply_temperature(ctx, raw);
        Ok(())
    }
}

impl Behavior for Thermometer {
    fn name(&self) -> &'static str {
        "thermometer"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        state.text(StateKey::TemperatureDisplay).map(str::to_string)
    }
}

/// Relative humidity on `sensor/humidity`.
#[derive(Debug)]
pub(crate) struct Hygrometer {
    table: RuleTable<Self>,
}

impl Hygrometer {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "sensor/humidity",
        apply: Self::reading,
    }];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "sensor", 0),
        }
    }

    fn reading(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let raw = decode::parse_float("humidity", payload)?;
        apply_humidity(ctx, raw);
        Ok(())
    }
}

impl Behavior for Hygrometer {
    fn name(&self) -> &'static str {
        "hygrometer"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        state
            .float(StateKey::Humidity)
            .map(|humidity| format!("{} %RH", units::format_decimal(humidity, 1)))
    }
}

/// Door/window contact with tilt and vibration.
#[derive(Debug)]
pub(crate) struct Contact {
    table: RuleTable<Self>,
}

impl Contact {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "sensor/state",
            apply: Self::contact,
        },
        Rule {
            pattern: "sensor/tilt",
            apply: Self::tilt,
        },
        Rule {
            pattern: "sensor/vibration",
            apply: Self::vibration,
        },
    ];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "sensor", 0),
        }
    }

    fn contact(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let open = decode::parse_word("state", payload, &["open", "close"])? == "open";
        ctx.set(StateKey::Open, open);
        Ok(())
    }

    fn tilt(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let degrees = decode::parse_integer("tilt", payload)?;
        // -1 while tilt detection is uncalibrated
        if degrees >= 0 {
            ctx.set(StateKey::Tilt, degrees);
        }
        Ok(())
    }

    fn vibration(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let shaking = decode::parse_flag("vibration", payload)?;
        ctx.set(StateKey::Vibration, shaking);
        Ok(())
    }
}

impl Behavior for Contact {
    fn name(&self) -> &'static str {
        "contact"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let open = state.bool(StateKey::Open)?;
        Some(if open { "open" } else { "closed" }.to_string())
    }
}

/// Illuminance on `sensor/lux`.
#[derive(Debug)]
pub(crate) struct Illuminance {
    table: RuleTable<Self>,
}

impl Illuminance {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "sensor/lux",
        apply: Self::reading,
    }];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "sensor", 0),
        }
    }

    fn reading(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let lux = decode::parse_float("lux", payload)?;
        ctx.set(StateKey::Lux, lux.max(0.0));
        Ok(())
    }
}

impl Behavior for Illuminance {
    fn name(&self) -> &'static str {
        "illuminance"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        state
            .float(StateKey::Lux)
            .map(|lux| format!("{} lx", units::format_decimal(lux, 0)))
    }
}

/// A boolean alarm such as motion, flood or smoke.
///
/// The topic is fixed at construction, e.g. `sensor/flood`.
#[derive(Debug)]
pub(crate) struct FlagSensor {
    name: &'static str,
    key: StateKey,
    table: RuleTable<Self>,
}

impl FlagSensor {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "{p}",
        apply: Self::flag,
    }];

    pub(crate) fn new(name: &'static str, topic: &str, key: StateKey) -> Self {
        Self {
            name,
            key,
            table: RuleTable::bind(Self::RULES, topic, 0),
        }
    }

    fn flag(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let raised = decode::parse_flag(self.name, payload)?;
        if raised && ctx.state().bool(self.key) != Some(true) {
            ctx.log().warn(format_args!("{} detected", self.name));
        }
        ctx.set(self.key, raised);
        Ok(())
    }
}

impl Behavior for FlagSensor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        (state.bool(self.key) == Some(true)).then(|| self.name.to_string())
    }
}

const GAS_LEVELS: &[&str] = &["none", "mild", "heavy", "test", "unknown"];

/// Gas alarm level and concentration.
#[derive(Debug)]
pub(crate) struct Gas {
    table: RuleTable<Self>,
}

impl Gas {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "sensor/gas",
            apply: Self::alarm,
        },
        Rule {
            pattern: "sensor/concentration",
            apply: Self::concentration,
        },
    ];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "sensor", 0),
        }
    }

    fn alarm(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let level = decode::parse_word("gas", payload, GAS_LEVELS)?;
        if matches!(level, "mild" | "heavy") {
            ctx.log().warn(format_args!("Gas alarm: {level}"));
        }
        ctx.set(StateKey::Gas, level);
        Ok(())
    }

    fn concentration(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let ppm = decode::parse_integer("concentration", payload)?;
        ctx.set(StateKey::GasConcentration, ppm);
        Ok(())
    }
}

impl Behavior for Gas {
    fn name(&self) -> &'static str {
        "gas"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        match state.text(StateKey::Gas)? {
            "none" => None,
            level => Some(format!("gas {level}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DeviceConfig;
    use crate::model::behaviors::testing::Harness;
    use crate::types::{TemperatureConversion, TemperatureSettings};

    #[test]
    fn fahrenheit_conversion_with_offset() {
        let settings = TemperatureSettings {
            conversion: TemperatureConversion::CelsiusToFahrenheit,
            offset: 1.0,
            decimals: 1,
        };
        let mut h = Harness::new(DeviceConfig::new("shellyht").with_temperature(settings));
        let mut thermometer = Thermometer::new();
        h.handle(&mut thermometer, "sensor/temperature", "50");
        assert_eq!(h.state.float(StateKey::Temperature), Some(123.0));
        assert_eq!(h.state.text(StateKey::TemperatureDisplay), Some("123.0 °F"));
    }

    #[test]
    fn humidity_offset_is_clamped() {
        let mut h = Harness::new(DeviceConfig::new("shellyht").with_humidity_offset(5.0));
        let mut hygrometer = Hygrometer::new();
        h.handle(&mut hygrometer, "sensor/humidity", "97.5");
        assert_eq!(h.state.float(StateKey::Humidity), Some(100.0));
        h.handle(&mut hygrometer, "sensor/humidity", "40.2");
        assert_eq!(hygrometer.summary(&h.state).as_deref(), Some("45.2 %RH"));
    }

    #[test]
    fn battery_is_clamped() {
        let mut h = Harness::new(DeviceConfig::new("shellyht"));
        let mut battery = Battery::new();
        h.handle(&mut battery, "sensor/battery", "104");
        assert_eq!(h.state.integer(StateKey::Battery), Some(100));
    }

    #[test]
    fn contact_words() {
        let mut h = Harness::new(DeviceConfig::new("shellydw2"));
        let mut contact = Contact::new();
        h.handle(&mut contact, "sensor/state", "open");
        assert_eq!(contact.summary(&h.state).as_deref(), Some("open"));
        h.handle(&mut contact, "sensor/state", "close");
        assert_eq!(contact.summary(&h.state).as_deref(), Some("closed"));
        assert_eq!(h.handle(&mut contact, "sensor/state", "ajar"), Handled::Rejected);
        h.handle(&mut contact, "sensor/tilt", "-1");
        assert!(h.state.get(StateKey::Tilt).is_none());
    }

    #[test]
    fn flag_sensor_topic_and_summary() {
        let mut h = Harness::new(DeviceConfig::new("shellyflood"));
        let mut flood = FlagSensor::new("flood", "sensor/flood", StateKey::Flood);
        assert_eq!(flood.topics(), vec!["sensor/flood".to_string()]);
        h.handle(&mut flood, "sensor/flood", "true");
        assert_eq!(flood.summary(&h.state).as_deref(), Some("flood"));
        h.handle(&mut flood, "sensor/flood", "false");
        assert_eq!(flood.summary(&h.state), None);
    }

    #[test]
    fn gas_levels() {
        let mut h = Harness::new(DeviceConfig::new("shellygas"));
        let mut gas = Gas::new();
        h.handle(&mut gas, "sensor/gas", "none");
        assert_eq!(gas.summary(&h.state), None);
        h.handle(&mut gas, "sensor/gas", "mild");
        h.handle(&mut gas, "sensor/concentration", "120");
        assert_eq!(gas.summary(&h.state).as_deref(), Some("gas mild"));
        assert_eq!(h.state.integer(StateKey::GasConcentration), Some(120));
    }
}
