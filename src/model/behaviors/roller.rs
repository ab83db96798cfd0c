// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Roller shutters.

use crate::command::{Action, RollerCommand};
use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::decode;
use crate::types::Percent;

const ROLLER_STATES: &[&str] = &["open", "close", "stop"];

/// Roller motion and position on `roller/<ch>`.
#[derive(Debug)]
pub(crate) struct Roller {
    channel: u8,
    table: RuleTable<Self>,
}

impl Roller {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "roller/{ch}",
            apply: Self::motion,
        },
        Rule {
            pattern: "roller/{ch}/pos",
            apply: Self::position,
        },
    ];

    pub(crate) fn new(channel: u8) -> Self {
        Self {
            channel,
            table: RuleTable::bind(Self::RULES, "roller", channel),
        }
    }

    fn motion(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let state = decode::parse_word("roller", payload, ROLLER_STATES)?;
        ctx.set(StateKey::RollerState, state);
        Ok(())
    }

    fn position(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let position = decode::parse_integer("pos", payload)?;
        // -1 until the roller is calibrated
        if position < 0 {
            ctx.log().debug(format_args!("Roller {} is not calibrated", self.channel));
            return Ok(());
        }
        ctx.set(StateKey::Position, Percent::clamped(position).value());
        Ok(())
    }
}

impl RuleSet for Roller {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Roller {
    fn name(&self) -> &'static str {
        "roller"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn action(&mut self, ctx: &mut DeviceContext<'_>, action: &Action) -> Handled {
        let channel = self.channel;
        let command = match *action {
            Action::Open => RollerCommand::Open { channel },
            Action::Close => RollerCommand::Close { channel },
            Action::Stop => RollerCommand::Stop { channel },
            Action::SetPosition { position } => RollerCommand::Position {
                channel,
                position: Percent::clamped(position),
            },
            _ => return Handled::Ignored,
        };
        ctx.send(&command);
        Handled::Applied
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let motion = state.text(StateKey::RollerState);
        let position = state.integer(StateKey::Position);
        match (motion, position) {
            (Some(motion), Some(position)) => Some(format!("{motion} {position}%")),
            (Some(motion), None) => Some(motion.to_string()),
            (None, Some(position)) => Some(format!("{position}%")),
            (None, None) => None,
        }
    }
}
