// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimmable, color and white lights.

use crate::command::{Action, LightCommand, LightSet};
use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::{LightStatus, decode};
use crate::types::{ChannelLevel, ColorTemperature, Percent, PowerState};

const COLOR_MODE: &str = "color";

/// Light output on `<prefix>/<ch>` with a JSON status document.
///
/// `prefix` is `light`, `color` or `white` depending on the model. A
/// light pinned to a `mode` rejects status documents reporting another
/// mode. In color mode the reported gain is the brightness.
#[derive(Debug)]
pub(crate) struct Light {
    prefix: &'static str,
    channel: u8,
    mode: Option<&'static str>,
    temperature: bool,
    table: RuleTable<Self>,
}

impl Light {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "{p}/{ch}",
            apply: Self::output,
        },
        Rule {
            pattern: "{p}/{ch}/status",
            apply: Self::status,
        },
    ];

    pub(crate) fn new(prefix: &'static str, channel: u8, mode: Option<&'static str>) -> Self {
        Self {
            prefix,
            channel,
            mode,
            temperature: false,
            table: RuleTable::bind(Self::RULES, prefix, channel),
        }
    }

    /// Enables color temperature control.
    pub(crate) fn with_temperature(mut self) -> Self {
        self.temperature = true;
        self
    }

    fn is_color(&self) -> bool {
        self.mode == Some(COLOR_MODE)
    }

    fn output(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let on = decode::parse_flag(self.prefix, payload)?;
        ctx.set(StateKey::On, on);
        Ok(())
    }

    fn status(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let status: LightStatus = decode::parse_json(payload)?;
        if let (Some(expected), Some(reported)) = (self.mode, status.mode.as_deref())
            && reported != expected
        {
            return Err(ParseError::UnexpectedFormat(format!(
                "status reports mode {reported}, light is configured for {expected}"
            )));
        }

        if let Some(on) = status.ison {
            ctx.set(StateKey::On, on);
        }
        if let Some(mode) = status.mode {
            ctx.set(StateKey::LightMode, mode);
        }
        let level = if self.is_color() { status.gain } else { status.brightness };
        if let Some(level) = level {
            ctx.set(StateKey::Brightness, Percent::clamped(level).value());
        }
        for (key, level) in [
            (StateKey::Red, status.red),
            (StateKey::Green, status.green),
            (StateKey::Blue, status.blue),
            (StateKey::White, status.white),
        ] {
            if let Some(level) = level {
                ctx.set(key, ChannelLevel::clamped(level).value());
            }
        }
        if self.temperature
            && let Some(kelvin) = status.temp
        {
            ctx.set(StateKey::ColorTemperature, ColorTemperature::clamped(kelvin).kelvin());
        }
        if let Some(effect) = status.effect {
            ctx.set(StateKey::Effect, effect);
        }
        Ok(())
    }

    fn body(&self, state: PowerState) -> LightSet {
        let body = LightSet::turn(state);
        match self.mode {
            Some(mode) => body.with_mode(mode),
            None => body,
        }
    }

    fn send(&self, ctx: &mut DeviceContext<'_>, body: LightSet) -> Handled {
        ctx.send(&LightCommand::new(self.prefix, self.channel, body));
        Handled::Applied
    }
}

impl RuleSet for Light {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Light {
    fn name(&self) -> &'static str {
        "light"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn action(&mut self, ctx: &mut DeviceContext<'_>, action: &Action) -> Handled {
        match *action {
            Action::On => self.send(ctx, LightSet::turn(PowerState::On)),
            Action::Off => self.send(ctx, LightSet::turn(PowerState::Off)),
            Action::Toggle => self.send(ctx, LightSet::turn(PowerState::Toggle)),
            Action::SetBrightness { level } => {
                let level = Percent::clamped(level);
                let body = self.body(PowerState::On);
                let body = if self.is_color() {
                    body.with_gain(level)
                } else {
                    body.with_brightness(level)
                };
                self.send(ctx, body)
            }
            Action::SetColor {
                red,
                green,
                blue,
                white,
                gain,
            } if self.is_color() => {
                let body = self
                    .body(PowerState::On)
                    .with_gain(Percent::clamped(gain))
                    .with_rgbw(
                        ChannelLevel::clamped(red),
                        ChannelLevel::clamped(green),
                        ChannelLevel::clamped(blue),
                        ChannelLevel::clamped(white),
                    );
                self.send(ctx, body)
            }
            Action::SetColorTemperature { kelvin } if self.temperature => {
                let body = self
                    .body(PowerState::On)
                    .with_temperature(ColorTemperature::clamped(kelvin));
                self.send(ctx, body)
            }
            _ => Handled::Ignored,
        }
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let on = state.bool(StateKey::On)?;
        if !on {
            return Some("off".to_string());
        }
        Some(match state.integer(StateKey::Brightness) {
            Some(level) => format!("on {level}%"),
            None => "on".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DeviceConfig;
    use crate::model::behaviors::testing::Harness;

    #[test]
    fn white_status_maps_brightness() {
        let mut h = Harness::new(DeviceConfig::new("shellydimmer"));
        let mut light = Light::new("light", 0, None);
        let json = r#"{"ison":true,"mode":"white","brightness":140,"gain":10}"#;
        assert_eq!(h.handle(&mut light, "light/0/status", json), Handled::Applied);
        assert_eq!(h.state.bool(StateKey::On), Some(true));
        assert_eq!(h.state.integer(StateKey::Brightness), Some(100));
        assert_eq!(light.summary(&h.state).as_deref(), Some("on 100%"));
    }

    #[test]
    fn color_status_uses_gain() {
        let mut h = Harness::new(DeviceConfig::new("shellyrgbw2-color"));
        let mut light = Light::new("color", 0, Some("color"));
        let json = r#"{"ison":true,"mode":"color","red":255,"green":10,"blue":0,"white":0,"gain":40}"#;
        h.handle(&mut light, "color/0/status", json);
        assert_eq!(h.state.integer(StateKey::Brightness), Some(40));
        assert_eq!(h.state.integer(StateKey::Red), Some(255));
        assert_eq!(h.state.text(StateKey::LightMode), Some("color"));
    }

    #[test]
    fn mode_mismatch_is_rejected_whole() {
        let mut h = Harness::new(DeviceConfig::new("shellybulb-color"));
        let mut light = Light::new("light", 0, Some("color"));
        let json = r#"{"ison":true,"mode":"white","brightness":50}"#;
        assert_eq!(h.handle(&mut light, "light/0/status", json), Handled::Rejected);
        assert!(h.state.is_empty());
    }

    #[test]
    fn brightness_action_is_clamped() {
        let mut h = Harness::new(DeviceConfig::new("shellydimmer"));
        let mut light = Light::new("light", 0, None);
        assert_eq!(h.action(&mut light, &Action::SetBrightness { level: 250 }), Handled::Applied);
        assert_eq!(
            h.published(),
            vec![(
                "shellies/test/light/0/set".to_string(),
                r#"{"turn":"on","brightness":100}"#.to_string()
            )]
        );
    }

    #[test]
    fn unsupported_actions_are_ignored() {
        let mut h = Harness::new(DeviceConfig::new("shellyvintage"));
        let mut light = Light::new("light", 0, None);
        let color = Action::SetColor {
            red: 1,
            green: 2,
            blue: 3,
            white: 4,
            gain: 5,
        };
        assert_eq!(h.action(&mut light, &color), Handled::Ignored);
        assert_eq!(
            h.action(&mut light, &Action::SetColorTemperature { kelvin: 3000 }),
            Handled::Ignored
        );
        assert!(h.outbox.is_empty());
    }

    #[test]
    fn temperature_action_on_white_bulb() {
        let mut h = Harness::new(DeviceConfig::new("shellybulb-white"));
        let mut light = Light::new("light", 0, Some("white")).with_temperature();
        h.action(&mut light, &Action::SetColorTemperature { kelvin: 9000 });
        assert_eq!(
            h.published()[0].1,
            r#"{"turn":"on","mode":"white","temp":6500}"#
        );
    }
}
