// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power and energy metering.

use crate::command::Action;
use crate::error::ParseError;
use crate::model::{Behavior, DeviceContext, Handled, Rule, RuleSet, RuleTable, run_rules};
use crate::state::{DeviceState, StateKey};
use crate::telemetry::decode;
use crate::units::{self, EnergyMeter, WATT_MINUTES_PER_KWH};

/// Instant power and accumulated energy under `<prefix>/<ch>`.
///
/// The device counter is in watt-minutes and cannot be reset remotely, so
/// the displayed total runs through an [`EnergyMeter`] holding a local
/// offset. The meter is rebuilt from the persisted state on first use.
#[derive(Debug)]
pub(crate) struct Metered {
    meter: Option<EnergyMeter>,
    table: RuleTable<Self>,
}

impl Metered {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "{p}/{ch}/power",
            apply: Self::power,
        },
        Rule {
            pattern: "{p}/{ch}/energy",
            apply: Self::energy,
        },
    ];

    pub(crate) fn new(prefix: &str, channel: u8) -> Self {
        Self {
            meter: None,
            table: RuleTable::bind(Self::RULES, prefix, channel),
        }
    }

    fn power(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let watts = decode::parse_float("power", payload)?;
        ctx.set(StateKey::Power, watts);
        Ok(())
    }

    fn energy(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let raw = decode::parse_float("energy", payload)?;
        if raw < 0.0 {
            return Err(ParseError::invalid("energy", "counter cannot be negative"));
        }
        let meter = self.meter_for(ctx.state());
        meter.update(raw);
        let snapshot = *meter;
        write_meter(ctx, &snapshot);
        Ok(())
    }

    fn meter_for(&mut self, state: &DeviceState) -> &mut EnergyMeter {
        self.meter.get_or_insert_with(|| {
            let offset = state.float(StateKey::EnergyOffset).unwrap_or(0.0);
            let total_kwh = state.float(StateKey::Energy).unwrap_or(0.0);
            EnergyMeter::restore(offset, total_kwh * WATT_MINUTES_PER_KWH)
        })
    }
}

fn write_meter(ctx: &mut DeviceContext<'_>, meter: &EnergyMeter) {
    let kwh = meter.total_kwh();
    ctx.set(StateKey::Energy, kwh);
    ctx.set(StateKey::EnergyDisplay, units::format_kwh(kwh));
    ctx.set(StateKey::EnergyOffset, meter.offset());
}

impl RuleSet for Metered {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for Metered {
    fn name(&self) -> &'static str {
        "meter"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn action(&mut self, ctx: &mut DeviceContext<'_>, action: &Action) -> Handled {
        if !matches!(action, Action::ResetEnergy) {
            return Handled::Ignored;
        }
        let meter = self.meter_for(ctx.state());
        meter.reset();
        let snapshot = *meter;
        write_meter(ctx, &snapshot);
        ctx.log().info(format_args!("Energy total reset"));
        Handled::Applied
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let watts = state.float(StateKey::Power)?;
        Some(format!("{} W", units::format_decimal(watts, 1)))
    }
}

/// Extra readings of the EM family on `emeter/<ch>`.
#[derive(Debug)]
pub(crate) struct EmeterExtras {
    table: RuleTable<Self>,
}

impl EmeterExtras {
    const RULES: &[Rule<Self>] = &[
        Rule {
            pattern: "emeter/{ch}/voltage",
            apply: Self::voltage,
        },
        Rule {
            pattern: "emeter/{ch}/current",
            apply: Self::current,
        },
        Rule {
            pattern: "emeter/{ch}/pf",
            apply: Self::power_factor,
        },
        Rule {
            pattern: "emeter/{ch}/returned_energy",
            apply: Self::returned_energy,
        },
    ];

    pub(crate) fn new(channel: u8) -> Self {
        Self {
            table: RuleTable::bind(Self::RULES, "emeter", channel),
        }
    }

    fn voltage(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        ctx.set(StateKey::Voltage, decode::parse_float("voltage", payload)?);
        Ok(())
    }

    fn current(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        ctx.set(StateKey::Current, decode::parse_float("current", payload)?);
        Ok(())
    }

    fn power_factor(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        ctx.set(StateKey::PowerFactor, decode::parse_float("pf", payload)?);
        Ok(())
    }

    fn returned_energy(&mut self, ctx: &mut DeviceContext<'_>, payload: &str) -> Result<(), ParseError> {
        let watt_minutes = decode::parse_float("returned_energy", payload)?;
        ctx.set(StateKey::ReturnedEnergy, units::watt_minutes_to_kwh(watt_minutes));
        Ok(())
    }
}

impl RuleSet for EmeterExtras {
    fn rules(&self) -> &RuleTable<Self> {
        &self.table
    }
}

impl Behavior for EmeterExtras {
    fn name(&self) -> &'static str {
        "emeter"
    }

    fn topics(&self) -> Vec<String> {
        self.table.suffixes()
    }

    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled {
        run_rules(self, ctx, suffix, payload)
    }

    fn summary(&self, state: &DeviceState) -> Option<String> {
        let volts = state.float(StateKey::Voltage)?;
        Some(format!("{} V", units::format_decimal(volts, 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DeviceConfig;
    use crate::model::behaviors::testing::Harness;

    fn energy(h: &Harness) -> f64 {
        h.state.float(StateKey::Energy).unwrap()
    }

    #[test]
    fn reset_zeroes_displayed_total() {
        let mut h = Harness::new(DeviceConfig::new("shelly1pm"));
        let mut meter = Metered::new("relay", 0);

        h.handle(&mut meter, "relay/0/energy", "6000");
        assert!((energy(&h) - 0.1).abs() < 1e-9);

        assert_eq!(h.action(&mut meter, &Action::ResetEnergy), Handled::Applied);
        assert_eq!(energy(&h), 0.0);
        assert!(h.outbox.is_empty());

        h.handle(&mut meter, "relay/0/energy", "9000");
        assert!((energy(&h) - 0.05).abs() < 1e-9);
        assert_eq!(h.state.text(StateKey::EnergyDisplay), Some("0.050 kWh"));
    }

    #[test]
    fn counter_restart_continues_total() {
        let mut h = Harness::new(DeviceConfig::new("shelly1pm"));
        // Displayed 0.5 kWh with an offset from an earlier reset.
        h.state.set(StateKey::EnergyOffset, 50_000.0);
        h.state.set(StateKey::Energy, 0.5);
        let mut meter = Metered::new("relay", 0);

        h.handle(&mut meter, "relay/0/energy", "1200");
        assert!((energy(&h) - 0.5).abs() < 1e-9);

        h.handle(&mut meter, "relay/0/energy", "7200");
        assert!((energy(&h) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn negative_counter_is_rejected() {
        let mut h = Harness::new(DeviceConfig::new("shelly1pm"));
        let mut meter = Metered::new("relay", 0);
        assert_eq!(h.handle(&mut meter, "relay/0/energy", "-5"), Handled::Rejected);
        assert!(h.state.is_empty());
    }

    #[test]
    fn power_summary() {
        let mut h = Harness::new(DeviceConfig::new("shellyplug-s"));
        let mut meter = Metered::new("relay", 0);
        h.handle(&mut meter, "relay/0/power", "12.34");
        assert_eq!(h.state.float(StateKey::Power), Some(12.34));
        assert_eq!(meter.summary(&h.state).as_deref(), Some("12.3 W"));
    }

    #[test]
    fn emeter_extras() {
        let mut h = Harness::new(DeviceConfig::new("shellyem"));
        let mut extras = EmeterExtras::new(1);
        h.handle(&mut extras, "emeter/1/voltage", "231.4");
        h.handle(&mut extras, "emeter/1/returned_energy", "30000");
        assert_eq!(h.state.float(StateKey::Voltage), Some(231.4));
        assert_eq!(h.state.float(StateKey::ReturnedEnergy), Some(0.5));
        assert_eq!(h.handle(&mut extras, "emeter/0/voltage", "1"), Handled::Ignored);
    }
}
