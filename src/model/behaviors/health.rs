// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-wide topics shared by every mains and battery device.

use crate::command::{Action, DeviceCommand};
use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::decode;

/// `online`, internal `temperature` and `overtemperature`, plus the
/// device-level commands.
#[derive(Debug)]
pub(crate) struct Health {
    table: RuleTable<Self>,
}

impl Health {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "online",
            apply: Self::online,
        },
        Rule {
            pattern: "temperature",
            apply: Self::temperature,
        },
        Rule {
            pattern: "overtemperature",
            apply: Self::overtemperature,
        },
    ];

    pub(crate) fn new() -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "", 0),
        }
    }

    fn online(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let online = decode::parse_flag("online", payload)?;
        ctx.set(StateKey::Online, online);
        Ok(())
    }

    fn temperature(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let celsius = decode::parse_float("temperature", payload)?;
        ctx.set(StateKey::DeviceTemperature, celsius);
        Ok(())
    }

    fn overtemperature(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let hot = decode::parse_flag("overtemperature", payload)?;
        if hot && ctx.state().bool(StateKey::Overtemperature) != Some(true) {
            ctx.log().warn(format_args!("Device reports overheating"));
        }
        ctx.set(StateKey::Overtemperature, hot);
        Ok(())
    }
}

impl RuleSet for Health {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Health {
    fn name(&self) -> &'static str {
        "health"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn action(&mut self, ctx: &mut DeviceContext<'_>, action: &Action) -> Handled {
        let command = match action {
            Action::Update => DeviceCommand::Update,
            Action::Announce => DeviceCommand::Announce,
            Action::UpdateFirmware => DeviceCommand::UpdateFirmware,
            _ => return Handled::Ignored,
        };
        ctx.send(&command);
        Handled::Applied
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        if state.bool(StateKey::Online) == Some(false) {
            Some("offline".to_string())
        } else if state.bool(StateKey::Overtemperature) == Some(true) {
            Some("overheated".to_string())
        } else {
            None
        }
    }
}
