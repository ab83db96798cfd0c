// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end routing tests through the device manager and an in-memory
//! transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use shellor_lib::command::Action;
use shellor_lib::event::{DeviceEvent, DeviceId};
use shellor_lib::manager::{DeviceConfig, DeviceManager, LifecycleState, ManagerConfig, StartOutcome};
use shellor_lib::model::{fields, validate_config};
use shellor_lib::protocol::{InboundMessage, Inbox, InboxSender, MemoryTransport};
use shellor_lib::state::StateKey;
use shellor_lib::types::{TemperatureConversion, TemperatureSettings};
use tokio::sync::broadcast;

struct Rig {
    manager: DeviceManager,
    sender: InboxSender,
    transport: Arc<MemoryTransport>,
}

impl Rig {
    fn new() -> Self {
        let inbox = Inbox::new();
        let sender = inbox.sender();
        let transport = Arc::new(MemoryTransport::new());
        let manager = DeviceManager::new(ManagerConfig::default(), transport.clone(), inbox);
        Self {
            manager,
            sender,
            transport,
        }
    }

    fn start(&mut self, config: DeviceConfig) -> DeviceId {
        let id = config.id;
        self.manager.start_device(config).unwrap();
        id
    }

    fn send(&mut self, topic: &str, payload: &str) {
        assert!(self.sender.offer(InboundMessage::new(1, "mqtt", topic, payload)));
        self.manager.process_pending();
    }

    fn float(&self, id: DeviceId, key: StateKey) -> Option<f64> {
        self.manager.state(id).and_then(|state| state.float(key))
    }

    fn text(&self, id: DeviceId, key: StateKey) -> Option<String> {
        self.manager
            .state(id)
            .and_then(|state| state.text(key))
            .map(str::to_string)
    }

    fn bool(&self, id: DeviceId, key: StateKey) -> Option<bool> {
        self.manager.state(id).and_then(|state| state.bool(key))
    }
}

fn drain(events: &mut broadcast::Receiver<DeviceEvent>) -> Vec<DeviceEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|value| (value - expected).abs() < 1e-9)
}

// ============================================================================
// Routing
// ============================================================================

mod routing {
    use super::*;

    #[test]
    fn start_then_stop_restores_index() {
        let mut rig = Rig::new();
        rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/keep"));
        let before = rig.manager.subscriptions().clone();

        let id = rig.start(
            DeviceConfig::new("shellydimmer")
                .with_broker(1)
                .with_address("shellies/keep"),
        );
        assert_ne!(rig.manager.subscriptions(), &before);
        rig.manager.stop_device(id).unwrap();

        assert_eq!(rig.manager.subscriptions(), &before);
    }

    #[test]
    fn every_listener_handles_once() {
        let mut rig = Rig::new();
        let first = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/twin"));
        let second = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/twin"));

        rig.send("shellies/twin/relay/0", "on");
        assert_eq!(rig.manager.delivered(first), Some(1));
        assert_eq!(rig.manager.delivered(second), Some(1));

        // Unchanged state still counts as a delivery.
        rig.send("shellies/twin/relay/0", "on");
        assert_eq!(rig.manager.delivered(first), Some(2));
        assert_eq!(rig.manager.delivered(second), Some(2));
    }

    #[test]
    fn device_with_several_message_types_handles_once() {
        let mut rig = Rig::new();
        let bridged = rig.start(
            DeviceConfig::new("shelly1")
                .with_broker(1)
                .with_address("shellies/shared")
                .with_message_types(["mqtt", "bridge"]),
        );
        let plain = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/shared"));

        rig.send("shellies/shared/relay/0", "on");
        assert_eq!(rig.manager.delivered(bridged), Some(1));
        assert_eq!(rig.manager.delivered(plain), Some(1));
        assert_eq!(rig.bool(bridged, StateKey::On), Some(true));

        assert!(rig.sender.offer(InboundMessage::new(1, "bridge", "shellies/shared/relay/0", "off")));
        assert_eq!(rig.manager.process_pending(), 1);
        assert_eq!(rig.manager.delivered(bridged), Some(2));
        assert_eq!(rig.manager.delivered(plain), Some(1));
        assert_eq!(rig.bool(bridged, StateKey::On), Some(false));
        assert_eq!(rig.bool(plain, StateKey::On), Some(true));
    }

    #[test]
    fn messages_apply_in_queue_order() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/seq"));
        for payload in ["on", "off", "on", "off"] {
            rig.sender
                .offer(InboundMessage::new(1, "mqtt", "shellies/seq/relay/0", payload));
        }
        let mut events = rig.manager.subscribe();
        assert_eq!(rig.manager.process_pending(), 4);

        let sequence: Vec<Option<bool>> = drain(&mut events)
            .into_iter()
            .filter_map(|event| match event {
                DeviceEvent::StateChanged { new_state, .. } => Some(new_state.bool(StateKey::On)),
                _ => None,
            })
            .collect();
        assert_eq!(sequence, [Some(true), Some(false), Some(true), Some(false)]);
        assert_eq!(rig.bool(id, StateKey::On), Some(false));
    }

    #[test]
    fn unrouted_and_unregistered_messages_are_dropped() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/a"));

        rig.send("shellies/nobody/relay/0", "on");
        assert!(!rig.sender.offer(InboundMessage::new(1, "zigbee", "shellies/a/relay/0", "on")));
        assert_eq!(rig.bool(id, StateKey::On), None);
    }

    #[test]
    fn stopped_device_ignores_queued_messages() {
        let mut rig = Rig::new();
        let keep = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/keep"));
        let id = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/gone"));
        rig.sender
            .offer(InboundMessage::new(1, "mqtt", "shellies/gone/relay/0", "on"));

        rig.manager.stop_device(id).unwrap();
        rig.manager.process_pending();
        assert_eq!(rig.bool(id, StateKey::On), None);
        assert_eq!(rig.manager.lifecycle(keep), Some(LifecycleState::Started));
    }
}

// ============================================================================
// Device behavior
// ============================================================================

mod behavior {
    use super::*;

    #[test]
    fn relay_overpower_keeps_on() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/test"));

        rig.send("shellies/test/relay/0", "on");
        assert_eq!(rig.bool(id, StateKey::On), Some(true));

        rig.send("shellies/test/relay/0", "overpower");
        assert_eq!(rig.bool(id, StateKey::Overpower), Some(true));
        assert_eq!(rig.bool(id, StateKey::On), Some(true));

        rig.send("shellies/test/relay/0", "off");
        assert_eq!(rig.bool(id, StateKey::Overpower), Some(false));
    }

    #[test]
    fn energy_reset_zeroes_display() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shellyplug-s").with_broker(1).with_address("shellies/plug"));

        rig.send("shellies/plug/relay/0/energy", "6000");
        assert!(approx(rig.float(id, StateKey::Energy), 0.1));

        rig.manager.send_action(id, &Action::ResetEnergy).unwrap();
        assert!(approx(rig.float(id, StateKey::Energy), 0.0));

        rig.send("shellies/plug/relay/0/energy", "9000");
        assert!(approx(rig.float(id, StateKey::Energy), 0.05));
        assert_eq!(rig.text(id, StateKey::EnergyDisplay).as_deref(), Some("0.050 kWh"));
    }

    #[test]
    fn energy_counter_restart_continues_total() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shelly1pm").with_broker(1).with_address("shellies/pm"));

        rig.send("shellies/pm/relay/0/energy", "60000");
        rig.manager.send_action(id, &Action::ResetEnergy).unwrap();
        rig.send("shellies/pm/relay/0/energy", "90000");
        assert!(approx(rig.float(id, StateKey::Energy), 0.5));

        // Device rebooted, counter starts over below the stored offset
        rig.send("shellies/pm/relay/0/energy", "1200");
        assert!(approx(rig.float(id, StateKey::Energy), 0.5));

        rig.send("shellies/pm/relay/0/energy", "7200");
        assert!(approx(rig.float(id, StateKey::Energy), 0.6));
    }

    #[test]
    fn energy_offset_survives_restart() {
        let mut rig = Rig::new();
        let config = DeviceConfig::new("shellyplug").with_broker(1).with_address("shellies/p");
        let id = rig.start(config.clone());

        rig.send("shellies/p/relay/0/energy", "6000");
        rig.manager.send_action(id, &Action::ResetEnergy).unwrap();
        rig.manager.stop_device(id).unwrap();
        rig.start(config);

        rig.send("shellies/p/relay/0/energy", "12000");
        assert!(approx(rig.float(id, StateKey::Energy), 0.1));
    }

    #[test]
    fn converted_temperature_with_offset() {
        let mut rig = Rig::new();
        let id = rig.start(
            DeviceConfig::new("shellyht")
                .with_broker(1)
                .with_address("shellies/ht")
                .with_temperature(TemperatureSettings {
                    conversion: TemperatureConversion::CelsiusToFahrenheit,
                    offset: 2.0,
                    decimals: 1,
                }),
        );

        rig.send("shellies/ht/sensor/temperature", "50");
        assert_eq!(rig.text(id, StateKey::TemperatureDisplay).as_deref(), Some("124.0 °F"));
        assert!(approx(rig.float(id, StateKey::Temperature), 124.0));
    }

    #[test]
    fn malformed_json_leaves_state() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shellydimmer").with_broker(1).with_address("shellies/dim"));

        rig.send("shellies/dim/light/0/status", r#"{"ison":true,"brightness":40}"#);
        let before = rig.manager.state(id).cloned();

        let mut events = rig.manager.subscribe();
        rig.send("shellies/dim/light/0/status", r#"{"ison":false,"bright"#);
        assert_eq!(rig.manager.state(id).cloned(), before);
        assert!(drain(&mut events).is_empty());
        assert_eq!(rig.manager.lifecycle(id), Some(LifecycleState::Started));
    }

    #[test]
    fn commands_use_device_address() {
        let mut rig = Rig::new();
        let id = rig.start(DeviceConfig::new("shellytrv").with_broker(1).with_address("shellies/trv"));
        rig.transport.take_published();

        rig.manager
            .send_action(id, &Action::SetTargetTemperature { value: 21.5 })
            .unwrap();
        rig.manager.send_action(id, &Action::Update).unwrap();

        let published: Vec<(String, String)> = rig
            .transport
            .take_published()
            .into_iter()
            .map(|m| (m.topic, m.payload))
            .collect();
        assert_eq!(
            published,
            [
                ("shellies/trv/thermostat/0/command/target_t".to_string(), "21.5".to_string()),
                ("shellies/trv/command".to_string(), "update".to_string()),
            ]
        );
    }

    #[test]
    fn muted_device_still_routes() {
        let mut rig = Rig::new();
        let id = rig.start(
            DeviceConfig::new("shellyflood")
                .with_broker(1)
                .with_address("shellies/flood")
                .muted(true),
        );
        rig.send("shellies/flood/sensor/battery", "87");
        assert_eq!(rig.manager.state(id).and_then(|s| s.integer(StateKey::Battery)), Some(87));
    }
}

// ============================================================================
// Add-ons
// ============================================================================

mod addons {
    use super::*;

    #[test]
    fn addon_before_host_is_pending() {
        let mut rig = Rig::new();
        let host = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/host");
        let probe = DeviceConfig::addon("addon-temperature", host.id).with_channel(1);
        let probe_id = probe.id;
        let mut events = rig.manager.subscribe();

        assert_eq!(rig.manager.start_device(probe).unwrap(), StartOutcome::Pending);
        rig.start(host);
        assert_eq!(rig.manager.lifecycle(probe_id), Some(LifecycleState::Started));

        let lifecycle: Vec<&'static str> = drain(&mut events)
            .iter()
            .filter(|event| event.device_id() == Some(probe_id))
            .map(|event| match event {
                DeviceEvent::Pending { .. } => "pending",
                DeviceEvent::Started { .. } => "started",
                _ => "other",
            })
            .collect();
        assert_eq!(lifecycle, ["pending", "started"]);

        rig.send("shellies/host/ext_temperature/1", "21.4");
        assert_eq!(rig.text(probe_id, StateKey::TemperatureDisplay).as_deref(), Some("21.4 °C"));
    }

    #[test]
    fn multi_probe_hub_document() {
        let mut rig = Rig::new();
        let host = DeviceConfig::new("shelly1pm").with_broker(1).with_address("shellies/hub");
        let probe = DeviceConfig::addon("addon-temperature", host.id).with_probe("28bb02");
        let probe_id = probe.id;
        rig.start(host);
        rig.start(probe);

        rig.send(
            "shellies/hub/ext_temperatures",
            r#"{"0":{"hwID":"28aa01","tC":21.5},"1":{"hwID":"28bb02","tC":18.0}}"#,
        );
        assert!(approx(rig.float(probe_id, StateKey::Temperature), 18.0));
    }

    #[test]
    fn host_stop_parks_and_restart_resumes() {
        let mut rig = Rig::new();
        let host = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/host");
        let switch = DeviceConfig::addon("addon-switch", host.id);
        let (host_id, switch_id) = (host.id, switch.id);
        rig.start(host.clone());
        rig.start(switch);

        rig.manager.stop_device(host_id).unwrap();
        assert_eq!(rig.manager.lifecycle(switch_id), Some(LifecycleState::Pending));
        assert_eq!(rig.manager.device_count(), 0);

        rig.start(host);
        rig.send("shellies/host/ext_switch/0", "1");
        assert_eq!(rig.bool(switch_id, StateKey::Input), Some(true));
    }
}

// ============================================================================
// Discovery and configuration
// ============================================================================

mod discovery {
    use super::*;

    #[test]
    fn announce_then_claim() {
        let mut rig = Rig::new();
        let mut events = rig.manager.subscribe();
        rig.send(
            "shellies/announce",
            r#"{"id":"shellyswitch25-D8BFC0","mac":"D8BFC01A2B3C","ip":"10.0.0.21","fw_ver":"20230913-112003","new_fw":false}"#,
        );

        let discovered = drain(&mut events)
            .into_iter()
            .find_map(|event| match event {
                DeviceEvent::Discovered { broker_id, device } => Some((broker_id, device)),
                _ => None,
            })
            .unwrap();
        assert_eq!(discovered.0, 1);
        assert_eq!(discovered.1.announcement.ip.as_deref(), Some("10.0.0.21"));

        rig.start(
            DeviceConfig::new("shellyswitch25-relay")
                .with_broker(1)
                .with_address("shellies/shellyswitch25-D8BFC0"),
        );
        assert!(rig.manager.discovered().is_empty());
    }

    #[test]
    fn validated_values_start_a_device() {
        let mut rig = Rig::new();
        let values: BTreeMap<String, String> = [
            (fields::TYPE, "shellyht"),
            (fields::BROKER, "1"),
            (fields::ADDRESS, "shellies/ht-bath/"),
            (fields::TEMPERATURE_UNIT, "C->F"),
            (fields::TEMPERATURE_OFFSET, "2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let validation = validate_config(&values);
        assert!(validation.valid, "{:?}", validation.field_errors);
        assert_eq!(validation.values[fields::ADDRESS], "shellies/ht-bath");

        let config = DeviceConfig::from_values(DeviceId::new(), &values).unwrap();
        let id = rig.start(config);
        rig.send("shellies/ht-bath/sensor/temperature", "50");
        assert_eq!(rig.text(id, StateKey::TemperatureDisplay).as_deref(), Some("124.0 °F"));
    }

    #[test]
    fn invalid_values_report_every_field() {
        let values: BTreeMap<String, String> = [
            (fields::TYPE, "shellytoaster"),
            (fields::CHANNEL, "two"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let validation = validate_config(&values);
        assert!(!validation.valid);
        assert!(validation.field_errors.contains_key(fields::TYPE));
        assert!(validation.field_errors.contains_key(fields::CHANNEL));
    }
}
