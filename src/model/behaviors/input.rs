// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch inputs and button events.

use serde::Deserialize;

use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::decode;

/// Event document on `input_event/<ch>`, e.g. `{"event":"SL","event_cnt":4}`.
#[derive(Debug, Deserialize)]
struct InputEventReport {
    #[serde(default)]
    event: String,
    #[serde(default)]
    event_cnt: Option<i64>,
}

/// Input level on `input/<ch>` and press events on `input_event/<ch>`.
#[derive(Debug)]
pub(crate) struct Input {
    table: RuleTable<Self>,
}

impl Input {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "input/{ch}",
            apply: Self::level,
        },
        Rule {
            pattern: "input_event/{ch}",
            apply: Self::event,
        },
    ];

    pub(crate) fn new(channel: u8) -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "input", channel),
        }
    }

    fn level(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let high = decode::parse_flag("input", payload)?;
        ctx.set(StateKey::Input, high);
        Ok(())
    }

    fn event(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let report: InputEventReport = decode::parse_json(payload)?;
        ctx.set(StateKey::InputEvent, report.event);
        if let Some(count) = report.event_cnt {
            ctx.set(StateKey::InputEventCount, count);
        }
        Ok(())
    }
}

impl RuleSet for Input {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Input {
    fn name(&self) -> &'static str {
        "input"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        state
            .text(StateKey::InputEvent)
            .filter(|event| !event.is_empty())
            .map(|event| format!("event {event}"))
    }
}
