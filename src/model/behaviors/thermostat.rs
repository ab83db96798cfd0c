// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Radiator valve (TRV).

use crate::command::{Action, ThermostatCommand};
use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::{ThermostatReport, decode};
use crate::types::{Percent, TemperatureSettings, TemperatureUnit};
use crate::units;

use super::set_display_temperature;

/// TRV reporting through `info` and `settings` documents.
///
/// The device always works in Celsius; readings and setpoints are shown
/// in the display unit of the configured conversion.
#[derive(Debug)]
pub(crate) struct Thermostat {
    channel: u8,
    settings: TemperatureSettings,
    table: RuleTable<Self>,
}

impl Thermostat {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "info",
            apply: Self::report,
        },
        Rule {
            pattern: "settings",
            apply: Self::report,
        },
    ];

    pub(crate) fn new(channel: u8, settings: TemperatureSettings) -> Self {
        Self {
            channel,
            settings,
            table: RuleTable::bind(Self::RULES, "", channel),
        }
    }

    fn displays_fahrenheit(&self) -> bool {
        self.settings.conversion.display_unit() == TemperatureUnit::Fahrenheit
    }

    fn to_display(&self, celsius: f64) -> f64 {
        if self.displays_fahrenheit() {
            units::celsius_to_fahrenheit(celsius)
        } else {
            celsius
        }
    }

    fn report(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let report: ThermostatReport = decode::parse_json(payload)?;

        if let Some(channel) = report.channel(self.channel) {
            if let Some(pos) = channel.pos {
                ctx.set(StateKey::ValvePosition, Percent::clamped(pos.round() as i64).value());
            }
            if let Some(target) = channel.target_t.as_ref().and_then(|t| t.celsius()) {
                ctx.set(StateKey::TargetTemperature, units::round_to(self.to_display(target), 1));
            }
            if let Some(measured) = channel.tmp.as_ref().and_then(|t| t.celsius()) {
                let value = self.to_display(measured) + self.settings.offset;
                set_display_temperature(ctx, value);
            }
        }
        if let Some(charge) = report.bat.and_then(|bat| bat.value) {
            ctx.set(StateKey::Battery, Percent::clamped(charge.round() as i64).value());
        }
        Ok(())
    }
}

impl RuleSet for Thermostat {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Thermostat {
    fn name(&self) -> &'static str {
        "thermostat"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn action(&mut self, ctx: &mut DeviceContext<'_>, action: &Action) -> Handled {
        let command = match *action {
            Action::SetTargetTemperature { value } => {
                if !value.is_finite() {
                    ctx.log().error(format_args!("Rejected setpoint {value}"));
                    return Handled::Rejected;
                }
                if self.displays_fahrenheit() {
                    ThermostatCommand::target_from_fahrenheit(self.channel, value)
                } else {
                    ThermostatCommand::target_from_celsius(self.channel, value)
                }
            }
            Action::SetValvePosition { position } => ThermostatCommand::ValvePosition {
                channel: self.channel,
                position: Percent::clamped(position),
            },
            _ => return Handled::Ignored,
        };
        ctx.send(&command);
        Handled::Applied
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let measured = state.text(StateKey::TemperatureDisplay);
        let target = state
            .float(StateKey::TargetTemperature)
            .map(|t| format!("target {}", self.settings.render(t)));
        match (measured, target) {
            (Some(measured), Some(target)) => Some(format!("{measured}, {target}")),
            (Some(measured), None) => Some(measured.to_string()),
            (None, target) => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DeviceConfig;
    use crate::model::behaviors::testing::Harness;
    use crate::types::TemperatureConversion;

    const INFO: &str = r#"{
        "thermostats": [{
            "pos": 42.4,
            "target_t": {"enabled": true, "value": 21.5, "units": "C"},
            "tmp": {"value": 19.34, "units": "C", "is_valid": true}
        }],
        "bat": {"value": 87, "voltage": 3.6}
    }"#;

    #[test]
    fn info_document_in_celsius() {
        let config = DeviceConfig::new("shellytrv");
        let mut trv = Thermostat::new(0, config.temperature);
        let mut h = Harness::new(config);
        assert_eq!(h.handle(&mut trv, "info", INFO), Handled::Applied);
        assert_eq!(h.state.integer(StateKey::ValvePosition), Some(42));
        assert_eq!(h.state.float(StateKey::TargetTemperature), Some(21.5));
        assert_eq!(h.state.integer(StateKey::Battery), Some(87));
        assert_eq!(trv.summary(&h.state).as_deref(), Some("19.3 °C, target 21.5 °C"));
    }

    #[test]
    fn settings_document_shown_in_fahrenheit() {
        let settings = TemperatureSettings {
            conversion: TemperatureConversion::CelsiusToFahrenheit,
            ..TemperatureSettings::default()
        };
        let config = DeviceConfig::new("shellytrv").with_temperature(settings);
        let mut trv = Thermostat::new(0, settings);
        let mut h = Harness::new(config);
        h.handle(&mut trv, "settings", r#"{"thermostats":[{"target_t":{"value":20,"units":"C"}}]}"#);
        assert_eq!(h.state.float(StateKey::TargetTemperature), Some(68.0));
    }

    #[test]
    fn invalid_reading_is_skipped() {
        let config = DeviceConfig::new("shellytrv");
        let mut trv = Thermostat::new(0, config.temperature);
        let mut h = Harness::new(config);
        h.handle(&mut trv, "info", r#"{"thermostats":[{"tmp":{"value":-100,"is_valid":false}}]}"#);
        assert!(h.state.get(StateKey::Temperature).is_none());
    }

    #[test]
    fn fahrenheit_setpoint_is_sent_in_celsius() {
        let settings = TemperatureSettings {
            conversion: TemperatureConversion::CelsiusToFahrenheit,
            ..TemperatureSettings::default()
        };
        let mut trv = Thermostat::new(0, settings);
        let mut h = Harness::new(DeviceConfig::new("shellytrv").with_temperature(settings));
        h.action(&mut trv, &Action::SetTargetTemperature { value: 70.0 });
        assert_eq!(
            h.published(),
            vec![("shellies/test/thermostat/0/command/target_t".to_string(), "21.1".to_string())]
        );
    }

    #[test]
    fn non_finite_setpoint_is_rejected() {
        let config = DeviceConfig::new("shellytrv");
        let mut trv = Thermostat::new(0, config.temperature);
        let mut h = Harness::new(config);
        let nan = Action::SetTargetTemperature { value: f64::NAN };
        assert_eq!(h.action(&mut trv, &nan), Handled::Rejected);
        assert!(h.outbox.is_empty());
    }
}
