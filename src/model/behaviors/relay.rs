// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay output.

use crate::command::{Action, RelayCommand};
use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::decode;
use crate::types::{PowerState, RelayReport};

/// On/off relay on `relay/<ch>`.
///
/// `overpower` arrives on the same topic as on/off. It raises the
/// overpower flag without touching the on-state; a genuine on/off clears
/// the flag again.
#[derive(Debug)]
pub(crate) struct Switch {
    channel: u8,
    table: RuleTable<Self>,
}

impl Switch {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "relay/{ch}",
        apply: Self::relay,
    }];

    pub(crate) fn new(channel: u8) -> Self {
        Self {
            channel,
            table: RuleTable::bind(Self::RULES, "relay", channel),
        }
    }

    fn relay(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        match decode::parse_relay("relay", payload)? {
            RelayReport::On => {
                ctx.set(StateKey::On, true);
                ctx.set(StateKey::Overpower, false);
            }
            RelayReport::Off => {
                ctx.set(StateKey::On, false);
                ctx.set(StateKey::Overpower, false);
            }
            RelayReport::Overpower => {
                ctx.log().warn(format_args!("Relay {} tripped on overpower", self.channel));
                ctx.set(StateKey::Overpower, true);
            }
        }
        Ok(())
    }
}

impl RuleSet for Switch {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Switch {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn action(&mut self, ctx: &mut DeviceContext<'_>, action: &Action) -> Handled {
        let state = match action {
            Action::On => PowerState::On,
            Action::Off => PowerState::Off,
            Action::Toggle => PowerState::Toggle,
            _ => return Handled::Ignored,
        };
        ctx.send(&RelayCommand::new(self.channel, state));
        Handled::Applied
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let on = state.bool(StateKey::On)?;
        let mut line = if on { "on" } else { "off" }.to_string();
        if state.bool(StateKey::Overpower) == Some(true) {
            line.push_str(" (overpower)");
        }
        Some(line)
    }
}
