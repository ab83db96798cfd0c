// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device start, stop and removal, plus announcement handling.

use chrono::Utc;

use crate::command::{Command, DeviceCommand};
use crate::error::{DeviceError, Error, ParseError};
use crate::event::{DeviceEvent, DeviceId};
use crate::model::{DeviceBinding, DeviceLog, lookup};
use crate::protocol::{BrokerId, OutboundMessage};
use crate::telemetry::Announcement;
use crate::types::TemperatureSettings;

use super::device_config::DeviceConfig;
use super::device_manager::DeviceManager;
use super::managed_device::{LifecycleState, ManagedDevice};

/// Result of a successful start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The device is subscribed and handling messages.
    Started,
    /// The add-on waits for its host and starts with it.
    Pending,
}

/// What an announcement did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// A started device owns the announced id.
    Claimed(DeviceId),
    /// First announcement of an unmanaged id.
    Discovered,
    /// Known unmanaged id, ledger entry refreshed.
    Refreshed,
}

/// Where a configuration listens, or which host it waits for.
enum Resolution {
    Bound(DeviceBinding),
    WaitForHost(DeviceId),
}

impl DeviceManager {
    // ========== Start ==========

    /// Starts a device.
    ///
    /// A device that is already started is stopped first and restarted with
    /// the new configuration. An add-on whose host is not started is parked
    /// and started together with its host.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDeviceType` for unknown tags and
    /// `DeviceError::InvalidConfiguration` when the configuration lacks a
    /// broker or host, or asks for more than four temperature decimals.
    /// Failed devices are reported with
    /// [`DeviceEvent::StartFailed`] and stay failed until started again.
    pub fn start_device(&mut self, config: DeviceConfig) -> Result<StartOutcome, Error> {
        self.start(config, false)
    }

    fn start(&mut self, config: DeviceConfig, retry: bool) -> Result<StartOutcome, Error> {
        let device_id = config.id;
        if self.devices.contains_key(&device_id) {
            self.stop_device(device_id)?;
        }
        self.forget_pending(device_id);

        let binding = match self.resolve(&config) {
            Ok(Resolution::Bound(binding)) => binding,
            Ok(Resolution::WaitForHost(host_id)) if !retry => {
                DeviceLog::new(config.label(), config.muted)
                    .info(format_args!("Waiting for host {host_id}"));
                self.pending.entry(host_id).or_default().push(config);
                self.set_lifecycle(device_id, LifecycleState::Pending);
                self.event_bus.publish(DeviceEvent::Pending { device_id, host_id });
                return Ok(StartOutcome::Pending);
            }
            Ok(Resolution::WaitForHost(host_id)) => {
                let err = DeviceError::HostUnavailable {
                    host: host_id.to_string(),
                };
                return Err(self.fail(&config, err.into()));
            }
            Err(err) => return Err(self.fail(&config, err)),
        };

        let state = self.retained.get(&device_id).cloned().unwrap_or_default();
        let device = match ManagedDevice::new(config.clone(), binding, state) {
            Ok(device) => device,
            Err(err) => return Err(self.fail(&config, err)),
        };
        self.retained.remove(&device_id);
        self.attach(device);
        self.start_dependents(device_id);
        Ok(StartOutcome::Started)
    }

    /// Works out where a configuration listens.
    fn resolve(&self, config: &DeviceConfig) -> Result<Resolution, Error> {
        let entry = lookup(&config.device_type)?;
        if config.temperature.decimals > TemperatureSettings::MAX_DECIMALS {
            return Err(DeviceError::InvalidConfiguration(format!(
                "at most {} decimals",
                TemperatureSettings::MAX_DECIMALS
            ))
            .into());
        }
        if entry.addon {
            let host_id = config.host_id.ok_or_else(|| {
                DeviceError::InvalidConfiguration(format!("{} needs a host device", entry.tag))
            })?;
            return Ok(match self.devices.get(&host_id) {
                Some(host) => Resolution::Bound(host.binding().clone()),
                None => Resolution::WaitForHost(host_id),
            });
        }

        let broker_id = config
            .broker_id
            .ok_or_else(|| DeviceError::InvalidConfiguration("no broker configured".to_string()))?;
        Ok(Resolution::Bound(DeviceBinding {
            broker_id,
            address: config.address.clone(),
            message_types: config.message_types.clone(),
        }))
    }

    /// Registers a built device everywhere and asks it to report in.
    fn attach(&mut self, device: ManagedDevice) {
        let device_id = device.id();
        let binding = device.binding().clone();

        let created = self.index.add(binding.broker_id, device_id, device.subscriptions());
        if self.config.subscribe_per_topic {
            for topic in &created {
                if let Err(e) = self.transport.subscribe(binding.broker_id, topic) {
                    tracing::warn!(broker = binding.broker_id, %topic, error = %e, "Subscribe failed");
                }
            }
        }
        for message_type in &binding.message_types {
            self.inbox.registry().add(message_type);
        }
        for claimed in self.ledger.purge_claimed(binding.broker_id, &binding.address) {
            device.log().debug(format_args!("Claimed announced device {}", claimed.id()));
        }

        let requests: Vec<OutboundMessage> = [DeviceCommand::Announce, DeviceCommand::Update]
            .iter()
            .filter_map(|command| {
                binding
                    .topic(&command.topic_suffix())
                    .map(|topic| OutboundMessage::new(binding.broker_id, topic, command.payload()))
            })
            .collect();
        self.publish_all(&requests);

        device.log().info(format_args!(
            "Started as {} with {} topics",
            device.model_name(),
            device.subscriptions().len()
        ));
        self.devices.insert(device_id, device);
        self.set_lifecycle(device_id, LifecycleState::Started);
        self.event_bus.publish(DeviceEvent::Started { device_id });
    }

    /// Gives every add-on parked on `host_id` its single retry.
    fn start_dependents(&mut self, host_id: DeviceId) {
        let Some(waiting) = self.pending.remove(&host_id) else {
            return;
        };
        for config in waiting {
            let addon_id = config.id;
            if let Err(e) = self.start(config, true) {
                tracing::debug!(device = %addon_id, host = %host_id, error = %e, "Add-on retry failed");
            }
        }
    }

    fn fail(&mut self, config: &DeviceConfig, err: Error) -> Error {
        DeviceLog::new(config.label(), config.muted).error(format_args!("Start failed: {err}"));
        self.set_lifecycle(config.id, LifecycleState::Failed);
        self.event_bus.publish(DeviceEvent::StartFailed {
            device_id: config.id,
            reason: err.to_string(),
        });
        err
    }

    // ========== Stop ==========

    /// Stops a device.
    ///
    /// Add-ons riding on the device are stopped first and parked until it
    /// starts again. Once this returns the device no longer receives
    /// messages; its state is kept for a later restart.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for unknown ids and
    /// `DeviceError::NotStarted` if the device is neither started nor
    /// pending.
    pub fn stop_device(&mut self, device_id: DeviceId) -> Result<(), Error> {
        if !self.devices.contains_key(&device_id) {
            if self.forget_pending(device_id).is_some() {
                self.set_lifecycle(device_id, LifecycleState::Stopped);
                self.event_bus.publish(DeviceEvent::Stopped { device_id });
                return Ok(());
            }
            return Err(if self.lifecycle.contains_key(&device_id) {
                DeviceError::NotStarted.into()
            } else {
                Error::DeviceNotFound
            });
        }

        self.park_dependents(device_id);
        self.detach(device_id);
        self.set_lifecycle(device_id, LifecycleState::Stopped);
        self.event_bus.publish(DeviceEvent::Stopped { device_id });
        Ok(())
    }

    /// Parks every add-on riding on `host_id`, deepest first.
    fn park_dependents(&mut self, host_id: DeviceId) {
        let dependents: Vec<DeviceId> = self
            .devices
            .values()
            .filter(|device| device.config.host_id == Some(host_id))
            .map(ManagedDevice::id)
            .collect();
        for addon_id in dependents {
            self.park_dependents(addon_id);
            if let Some(config) = self.detach(addon_id) {
                self.pending.entry(host_id).or_default().push(config);
                self.set_lifecycle(addon_id, LifecycleState::Pending);
                self.event_bus.publish(DeviceEvent::Pending { device_id: addon_id, host_id });
            }
        }
    }

    /// Unregisters a started device, retaining its state.
    ///
    /// Uses the subscription snapshot taken at start, and releases exactly
    /// the message-type references the device added.
    fn detach(&mut self, device_id: DeviceId) -> Option<DeviceConfig> {
        let device = self.devices.remove(&device_id)?;
        let binding = device.binding();

        let emptied = self.index.remove(binding.broker_id, device_id, device.subscriptions());
        if self.config.subscribe_per_topic {
            for topic in &emptied {
                if let Err(e) = self.transport.unsubscribe(binding.broker_id, topic) {
                    tracing::warn!(broker = binding.broker_id, %topic, error = %e, "Unsubscribe failed");
                }
            }
        }
        for message_type in &binding.message_types {
            self.inbox.registry().remove(message_type);
        }
        device.log().info(format_args!("Stopped"));

        let (config, state) = device.into_parts();
        self.retained.insert(device_id, state);
        Some(config)
    }

    /// Drops a parked add-on from the pending map.
    fn forget_pending(&mut self, device_id: DeviceId) -> Option<DeviceConfig> {
        let (host_id, position) = self.pending.iter().find_map(|(host_id, waiting)| {
            waiting
                .iter()
                .position(|config| config.id == device_id)
                .map(|position| (*host_id, position))
        })?;
        let waiting = self.pending.get_mut(&host_id)?;
        let config = waiting.remove(position);
        if waiting.is_empty() {
            self.pending.remove(&host_id);
        }
        Some(config)
    }

    // ========== Remove ==========

    /// Stops a device and forgets it, including its retained state.
    ///
    /// Add-ons of a removed host stay parked until a host with the same id
    /// starts.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if the manager does not know the id.
    pub fn remove_device(&mut self, device_id: DeviceId) -> Result<(), Error> {
        if !self.lifecycle.contains_key(&device_id) {
            return Err(Error::DeviceNotFound);
        }
        if self.devices.contains_key(&device_id) {
            self.stop_device(device_id)?;
        }
        self.forget_pending(device_id);
        self.retained.remove(&device_id);
        self.lifecycle.remove(&device_id);
        tracing::debug!(device = %device_id, "Device removed");
        self.event_bus.publish(DeviceEvent::Removed { device_id });
        Ok(())
    }

    // ========== Announcements ==========

    /// Records an announcement in the ledger unless a started device on the
    /// same broker owns the announced id.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for malformed payloads or a missing `id`.
    pub fn process_announcement(&mut self, broker_id: BrokerId, payload: &str) -> Result<AnnounceOutcome, ParseError> {
        let announcement = Announcement::parse(payload)?;

        let owner = self.devices.values().find(|device| {
            let binding = device.binding();
            binding.broker_id == broker_id
                && !binding.address.is_empty()
                && binding.address.contains(announcement.id.as_str())
        });
        if let Some(owner) = owner {
            let owner_id = owner.id();
            self.ledger.purge(broker_id, &announcement.id);
            return Ok(AnnounceOutcome::Claimed(owner_id));
        }

        let id = announcement.id.clone();
        if !self.ledger.upsert(broker_id, announcement, Utc::now()) {
            return Ok(AnnounceOutcome::Refreshed);
        }
        tracing::info!(broker = broker_id, %id, "Discovered unmanaged device");
        if let Some(device) = self.ledger.get(broker_id, &id).cloned() {
            self.event_bus.publish(DeviceEvent::Discovered { broker_id, device });
        }
        Ok(AnnounceOutcome::Discovered)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::manager::ManagerConfig;
    use crate::protocol::{Inbox, MemoryTransport};

    fn manager_with(config: ManagerConfig) -> (DeviceManager, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let manager = DeviceManager::new(config, transport.clone(), Inbox::new());
        (manager, transport)
    }

    fn manager() -> (DeviceManager, Arc<MemoryTransport>) {
        manager_with(ManagerConfig::default())
    }

    fn plug(address: &str) -> DeviceConfig {
        DeviceConfig::new("shellyplug-s").with_broker(1).with_address(address)
    }

    #[test]
    fn start_requests_announce_then_update() {
        let (mut manager, transport) = manager();
        manager.start_device(plug("shellies/plug")).unwrap();

        let published = transport.take_published();
        let payloads: Vec<&str> = published.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, ["announce", "update"]);
        assert!(published.iter().all(|m| m.topic == "shellies/plug/command"));
    }

    #[test]
    fn start_without_address_publishes_nothing() {
        let (mut manager, transport) = manager();
        let config = DeviceConfig::new("shelly1").with_broker(1);
        assert_eq!(manager.start_device(config).unwrap(), StartOutcome::Started);
        assert!(transport.published().is_empty());
        assert!(manager.subscriptions().is_empty());
    }

    #[test]
    fn unknown_type_fails_permanently() {
        let (mut manager, _) = manager();
        let config = DeviceConfig::new("shellytoaster").with_broker(1);
        let id = config.id;
        let mut events = manager.subscribe();

        assert!(matches!(manager.start_device(config), Err(Error::UnknownDeviceType(_))));
        assert_eq!(manager.lifecycle(id), Some(LifecycleState::Failed));
        assert!(matches!(events.try_recv(), Ok(DeviceEvent::StartFailed { .. })));
    }

    #[test]
    fn missing_broker_is_invalid() {
        let (mut manager, _) = manager();
        let err = manager.start_device(DeviceConfig::new("shelly1")).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::InvalidConfiguration(_))));
    }

    #[test]
    fn too_many_decimals_is_invalid() {
        let (mut manager, transport) = manager();
        let mut config = plug("shellies/plug");
        config.temperature.decimals = 7;
        let id = config.id;

        let err = manager.start_device(config).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::InvalidConfiguration(_))));
        assert_eq!(manager.lifecycle(id), Some(LifecycleState::Failed));
        assert!(transport.published().is_empty());
    }

    #[test]
    fn addon_without_host_is_invalid() {
        let (mut manager, _) = manager();
        let mut config = DeviceConfig::new("addon-switch");
        config.broker_id = Some(1);
        let err = manager.start_device(config).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::InvalidConfiguration(_))));
    }

    #[test]
    fn addon_waits_for_host() {
        let (mut manager, _) = manager();
        let host = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/host");
        let addon = DeviceConfig::addon("addon-temperature", host.id);
        let (host_id, addon_id) = (host.id, addon.id);

        assert_eq!(manager.start_device(addon).unwrap(), StartOutcome::Pending);
        assert_eq!(manager.lifecycle(addon_id), Some(LifecycleState::Pending));
        assert_eq!(manager.pending_count(), 1);

        manager.start_device(host).unwrap();
        assert_eq!(manager.lifecycle(addon_id), Some(LifecycleState::Started));
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(
            manager.subscriptions().listeners(1, "shellies/host/ext_temperature/0"),
            vec![addon_id]
        );
        assert_eq!(manager.lifecycle(host_id), Some(LifecycleState::Started));
    }

    #[test]
    fn stopping_host_parks_addons() {
        let (mut manager, _) = manager();
        let host = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/host");
        let addon = DeviceConfig::addon("addon-switch", host.id);
        let (host_id, addon_id) = (host.id, addon.id);
        manager.start_device(host.clone()).unwrap();
        manager.start_device(addon).unwrap();

        manager.stop_device(host_id).unwrap();
        assert_eq!(manager.lifecycle(addon_id), Some(LifecycleState::Pending));
        assert_eq!(manager.lifecycle(host_id), Some(LifecycleState::Stopped));
        assert!(manager.subscriptions().is_empty());

        manager.start_device(host).unwrap();
        assert_eq!(manager.lifecycle(addon_id), Some(LifecycleState::Started));
    }

    #[test]
    fn stopping_host_parks_nested_addons() {
        let (mut manager, _) = manager();
        let host = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/h");
        let outer = DeviceConfig::addon("addon-switch", host.id);
        let inner = DeviceConfig::addon("addon-temperature", outer.id);
        let (host_id, outer_id, inner_id) = (host.id, outer.id, inner.id);
        manager.start_device(host.clone()).unwrap();
        manager.start_device(outer).unwrap();
        assert_eq!(manager.start_device(inner).unwrap(), StartOutcome::Started);

        manager.stop_device(host_id).unwrap();
        assert_eq!(manager.lifecycle(host_id), Some(LifecycleState::Stopped));
        assert_eq!(manager.lifecycle(outer_id), Some(LifecycleState::Pending));
        assert_eq!(manager.lifecycle(inner_id), Some(LifecycleState::Pending));
        assert_eq!(manager.device_count(), 0);
        assert!(manager.subscriptions().is_empty());
        assert_eq!(manager.pending_count(), 2);

        manager.start_device(host).unwrap();
        assert_eq!(manager.lifecycle(outer_id), Some(LifecycleState::Started));
        assert_eq!(manager.lifecycle(inner_id), Some(LifecycleState::Started));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn stop_releases_message_types_it_added() {
        let (mut manager, _) = manager();
        let config = plug("shellies/plug").with_message_types(["mqtt", "bridge"]);
        let id = config.id;
        manager.start_device(config).unwrap();
        assert_eq!(manager.inbox.registry().count("mqtt"), 2);
        assert!(manager.inbox.registry().contains("bridge"));

        manager.stop_device(id).unwrap();
        assert_eq!(manager.inbox.registry().count("mqtt"), 1);
        assert!(!manager.inbox.registry().contains("bridge"));
    }

    #[test]
    fn per_topic_subscriptions_follow_the_index() {
        let (mut manager, transport) = manager_with(ManagerConfig::default().with_subscribe_per_topic(true));
        let config = plug("shellies/plug");
        let id = config.id;
        manager.start_device(config).unwrap();
        assert!(transport.subscriptions().contains(&(1, "shellies/plug/relay/0".to_string())));

        manager.stop_device(id).unwrap();
        assert!(transport.subscriptions().is_empty());
    }

    #[test]
    fn restart_replaces_configuration() {
        let (mut manager, _) = manager();
        let config = plug("shellies/old");
        let id = config.id;
        manager.start_device(config.clone()).unwrap();
        manager.start_device(config.with_address("shellies/new")).unwrap();

        assert!(manager.subscriptions().listeners(1, "shellies/old/relay/0").is_empty());
        assert_eq!(manager.subscriptions().listeners(1, "shellies/new/relay/0"), vec![id]);
        assert_eq!(manager.device_count(), 1);
    }

    #[test]
    fn stop_unknown_and_stopped() {
        let (mut manager, _) = manager();
        assert!(matches!(manager.stop_device(DeviceId::new()), Err(Error::DeviceNotFound)));

        let config = plug("shellies/plug");
        let id = config.id;
        manager.start_device(config).unwrap();
        manager.stop_device(id).unwrap();
        assert!(matches!(
            manager.stop_device(id),
            Err(Error::Device(DeviceError::NotStarted))
        ));
    }

    #[test]
    fn remove_forgets_everything() {
        let (mut manager, _) = manager();
        let config = plug("shellies/plug");
        let id = config.id;
        manager.start_device(config).unwrap();

        manager.remove_device(id).unwrap();
        assert_eq!(manager.lifecycle(id), None);
        assert!(manager.state(id).is_none());
        assert!(manager.subscriptions().is_empty());
        assert!(matches!(manager.remove_device(id), Err(Error::DeviceNotFound)));
    }

    #[test]
    fn remove_pending_addon() {
        let (mut manager, _) = manager();
        let addon = DeviceConfig::addon("addon-switch", DeviceId::new());
        let id = addon.id;
        manager.start_device(addon).unwrap();
        manager.remove_device(id).unwrap();
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn announcement_lifecycle() {
        let (mut manager, _) = manager();
        let payload = r#"{"id":"shellyplug-s-AABBCC","ip":"10.0.0.7","fw_ver":"1.11.0"}"#;

        assert_eq!(manager.process_announcement(1, payload).unwrap(), AnnounceOutcome::Discovered);
        assert_eq!(manager.process_announcement(1, payload).unwrap(), AnnounceOutcome::Refreshed);
        assert_eq!(manager.discovered().len(), 1);

        let config = plug("shellies/shellyplug-s-AABBCC");
        let id = config.id;
        manager.start_device(config).unwrap();
        assert!(manager.discovered().is_empty());
        assert_eq!(manager.process_announcement(1, payload).unwrap(), AnnounceOutcome::Claimed(id));
        assert!(manager.discovered().is_empty());
    }

    #[test]
    fn announcement_on_other_broker_is_not_claimed() {
        let (mut manager, _) = manager();
        manager.start_device(plug("shellies/shellyplug-s-AABBCC")).unwrap();
        let outcome = manager
            .process_announcement(2, r#"{"id":"shellyplug-s-AABBCC"}"#)
            .unwrap();
        assert_eq!(outcome, AnnounceOutcome::Discovered);
    }

    #[test]
    fn announcement_without_id_is_rejected() {
        let (mut manager, _) = manager();
        assert!(manager.process_announcement(1, r#"{"ip":"10.0.0.7"}"#).is_err());
        assert!(manager.process_announcement(1, "not json").is_err());
        assert!(manager.discovered().is_empty());
    }
}
