// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor add-on probes riding on a host device.
//!
//! Single probes publish on `ext_<kind>/<ch>`. When several DS18B20 probes
//! share the bus the host also publishes a hub document
//! (`ext_temperatures`, `ext_humidities`) keyed by bus index; a probe
//! configured with a hardware id is then picked out of that document.

use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::{decode, find_probe};

use super::{apply_humidity, apply_temperature};

/// Picks this probe's value out of a hub document.
///
/// Returns `Ok(None)` when the probe is not listed.
fn hub_value(
    ctx: &DeviceContext<'_>,
    probe_id: Option<&str>,
    payload: &str,
    field: &str,
) -> Result<Option<f64>, ParseError> {
    let Some(probe_id) = probe_id else {
        return Ok(None);
    };
    let reading = find_probe(payload, probe_id, field)?;
    if reading.is_none() {
        ctx.log()
            .debug(format_args!("Probe {probe_id} missing from hub document"));
    }
    Ok(reading.map(|r| r.value))
}

/// Temperature probe.
#[derive(Debug)]
pub(crate) struct AddonTemperature {
    probe_id: Option<String>,
    table: RuleTable<Self>,
}

impl AddonTemperature {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "ext_temperature/{ch}",
        apply: Self::single,
    }];

    const HUB_RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "ext_temperature/{ch}",
            apply: Self::single,
        },
        Rule {
            pattern: "ext_temperatures",
            apply: Self::hub,
        },
    ];

    pub(crate) fn new(channel: u8, probe_id: Option<String>) -> Self {
        let rules = if probe_id.is_some() { Self::HUB_RULES } else { Self::RULES };
        Self {
            probe_id,
            table: RuleTable::bind(rules, "ext_temperature", channel),
        }
    }

    fn single(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let raw = decode::parse_float("ext_temperature", payload)?;
        apply_temperature(ctx, raw);
        Ok(())
    }

    fn hub(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        if let Some(raw) = hub_value(ctx, self.probe_id.as_deref(), payload, "tC")? {
            apply_temperature(ctx, raw);
        }
        Ok(())
    }
}

impl RuleSet for AddonTemperature {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for AddonTemperature {
    fn name(&self) -> &'static str {
        "addon-temperature"
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

/// Humidity probe (DHT22).
#[derive(Debug)]
pub(crate) struct AddonHumidity {
    probe_id: Option<String>,
    table: RuleTable<Self>,
}

impl AddonHumidity {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "ext_humidity/{ch}",
        apply: Self::single,
    }];

    const HUB_RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "ext_humidity/{ch}",
            apply: Self::single,
        },
        Rule {
            pattern: "ext_humidities",
            apply: Self::hub,
        },
    ];

    pub(crate) fn new(channel: u8, probe_id: Option<String>) -> Self {
        let rules = if probe_id.is_some() { Self::HUB_RULES } else { Self::RULES };
        Self {
            probe_id,
            table: RuleTable::bind(rules, "ext_humidity", channel),
        }
    }

    fn single(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let raw = decode::parse_float("ext_humidity", payload)?;
        apply_humidity(ctx, raw);
        Ok(())
    }

    fn hub(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        if let Some(raw) = hub_value(ctx, self.probe_id.as_deref(), payload, "hum")? {
            apply_humidity(ctx, raw);
        }
        Ok(())
    }
}

impl RuleSet for AddonHumidity {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for AddonHumidity {
    fn name(&self) -> &'static str {
        "addon-humidity"
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
            .map(|humidity| format!("{humidity} %RH"))
    }
}

/// Detached switch input wired to the add-on.
#[derive(Debug)]
pub(crate) struct AddonSwitch {
    table: RuleTable<Self>,
}

impl AddonSwitch {
    const RULES: &[Rule<Self>] = &[Rule {
        pattern: "ext_switch/{ch}",
        apply: Self::level,
    }];

    pub(crate) fn new(channel: u8) -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "ext_switch", channel),
        }
    }

    fn level(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let closed = decode::parse_flag("ext_switch", payload)?;
        ctx.set(StateKey::Input, closed);
        Ok(())
    }
}

impl RuleSet for AddonSwitch {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for AddonSwitch {
    fn name(&self) -> &'static str {
        "addon-switch"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let closed = state.bool(StateKey::Input)?;
        Some(if closed { "closed" } else { "open" }.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceId;
    use crate::manager::DeviceConfig;
    use crate::model::behaviors::testing::Harness;

    const HUB: &str = r#"{"0":{"hwID":"28aa01","tC":21.5},"1":{"hwID":"28BB02","tC":18.0}}"#;

    #[test]
    fn single_probe_topic() {
        let mut h = Harness::new(DeviceConfig::addon("addon-temperature", DeviceId::new()));
        let mut probe = AddonTemperature::new(2, None);
        assert_eq!(probe.topics(), vec!["ext_temperature/2".to_string()]);
        h.handle(&mut probe, "ext_temperature/2", "22.4");
        assert_eq!(h.state.text(StateKey::TemperatureDisplay), Some("22.4 °C"));
        assert_eq!(h.handle(&mut probe, "ext_temperatures", HUB), Handled::Ignored);
    }

    #[test]
    fn hub_document_selects_probe_by_id() {
        let mut h = Harness::new(DeviceConfig::addon("addon-temperature", DeviceId::new()));
        let mut probe = AddonTemperature::new(0, Some("28bb02".to_string()));
        assert_eq!(h.handle(&mut probe, "ext_temperatures", HUB), Handled::Applied);
        assert_eq!(h.state.float(StateKey::Temperature), Some(18.0));
    }

    #[test]
    fn unknown_probe_leaves_state_alone() {
        let mut h = Harness::new(DeviceConfig::addon("addon-temperature", DeviceId::new()));
        let mut probe = AddonTemperature::new(0, Some("ffff".to_string()));
        assert_eq!(h.handle(&mut probe, "ext_temperatures", HUB), Handled::Applied);
        assert!(h.state.is_empty());
        assert_eq!(h.handle(&mut probe, "ext_temperatures", "[1,2]"), Handled::Rejected);
    }

    #[test]
    fn humidity_hub_with_offset() {
        let config = DeviceConfig::addon("addon-humidity", DeviceId::new()).with_humidity_offset(-2.0);
        let mut h = Harness::new(config);
        let mut probe = AddonHumidity::new(0, Some("dht01".to_string()));
        h.handle(&mut probe, "ext_humidities", r#"{"0":{"hwID":"dht01","hum":50.5}}"#);
        assert_eq!(h.state.float(StateKey::Humidity), Some(48.5));
    }

    #[test]
    fn detached_switch() {
        let mut h = Harness::new(DeviceConfig::addon("addon-switch", DeviceId::new()));
        let mut switch = AddonSwitch::new(0);
        h.handle(&mut switch, "ext_switch/0", "1");
        assert_eq!(switch.summary(&h.state).as_deref(), Some("closed"));
    }
}
