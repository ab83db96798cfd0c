// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinator owning every registry of the routing layer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::command::Action;
use crate::discovery::DiscoveredLedger;
use crate::error::{DeviceError, Error};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::protocol::{Inbox, OutboundMessage, Transport};
use crate::state::{DeviceState, StateChange};

use super::device_config::{DeviceConfig, ManagerConfig};
use super::managed_device::{LifecycleState, ManagedDevice, Reaction};
use super::subscription_index::SubscriptionIndex;

/// Coordinator of the device registries and the dispatch loop.
///
/// The manager owns the live device registry, the subscription index, the
/// pending add-on map, the discovered-device ledger and the event bus. All
/// device state mutation happens through `&mut self`, so a single task
/// drives it; hosts share it behind a `tokio::sync::Mutex` (see
/// [`spawn`](super::spawn)).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use shellor_lib::event::DeviceEvent;
/// use shellor_lib::manager::{DeviceConfig, DeviceManager, ManagerConfig, StartOutcome};
/// use shellor_lib::protocol::{InboundMessage, Inbox, MemoryTransport};
///
/// # fn main() -> shellor_lib::Result<()> {
/// let transport = Arc::new(MemoryTransport::new());
/// let inbox = Inbox::new();
/// let sender = inbox.sender();
/// let mut manager = DeviceManager::new(ManagerConfig::default(), transport.clone(), inbox);
/// let mut events = manager.subscribe();
///
/// let config = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/test");
/// let id = config.id;
/// assert_eq!(manager.start_device(config)?, StartOutcome::Started);
///
/// sender.offer(InboundMessage::new(1, "mqtt", "shellies/test/relay/0", "on"));
/// manager.process_pending();
///
/// let state = manager.state(id).unwrap();
/// assert_eq!(state.bool(shellor_lib::state::StateKey::On), Some(true));
/// assert!(matches!(events.try_recv(), Ok(DeviceEvent::Started { .. })));
/// # Ok(())
/// # }
/// ```
pub struct DeviceManager {
    pub(super) config: ManagerConfig,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) inbox: Inbox,
    /// Started devices.
    pub(super) devices: HashMap<DeviceId, ManagedDevice>,
    /// Add-ons waiting for a host, keyed by host id.
    pub(super) pending: HashMap<DeviceId, Vec<DeviceConfig>>,
    pub(super) lifecycle: HashMap<DeviceId, LifecycleState>,
    /// Last state of stopped devices, restored on restart.
    pub(super) retained: HashMap<DeviceId, DeviceState>,
    pub(super) index: SubscriptionIndex,
    pub(super) ledger: DiscoveredLedger,
    pub(super) event_bus: EventBus,
}

impl DeviceManager {
    /// Creates a manager draining `inbox` and publishing through `transport`.
    ///
    /// The discovery message types are registered right away so announce
    /// messages reach the queue before any device starts.
    #[must_use]
    pub fn new(config: ManagerConfig, transport: Arc<dyn Transport>, inbox: Inbox) -> Self {
        for message_type in &config.discovery_message_types {
            inbox.registry().add(message_type);
        }
        let event_bus = EventBus::with_capacity(config.event_capacity);
        Self {
            config,
            transport,
            inbox,
            devices: HashMap::new(),
            pending: HashMap::new(),
            lifecycle: HashMap::new(),
            retained: HashMap::new(),
            index: SubscriptionIndex::new(),
            ledger: DiscoveredLedger::new(),
            event_bus,
        }
    }

    // ========== Queries ==========

    /// Subscribes to device events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the manager configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the state of a started device, or the retained state of a
    /// stopped one.
    #[must_use]
    pub fn state(&self, device_id: DeviceId) -> Option<&DeviceState> {
        self.devices
            .get(&device_id)
            .map(|device| &device.state)
            .or_else(|| self.retained.get(&device_id))
    }

    /// Returns the lifecycle state of a known device.
    #[must_use]
    pub fn lifecycle(&self, device_id: DeviceId) -> Option<LifecycleState> {
        self.lifecycle.get(&device_id).copied()
    }

    /// Returns the configuration of a started device.
    #[must_use]
    pub fn device_config(&self, device_id: DeviceId) -> Option<&DeviceConfig> {
        self.devices.get(&device_id).map(|device| &device.config)
    }

    /// Returns the catalog name of a started device.
    #[must_use]
    pub fn model_name(&self, device_id: DeviceId) -> Option<&'static str> {
        self.devices.get(&device_id).map(ManagedDevice::model_name)
    }

    /// Returns how many messages a started device was handed since it
    /// started.
    #[must_use]
    pub fn delivered(&self, device_id: DeviceId) -> Option<u64> {
        self.devices.get(&device_id).map(ManagedDevice::delivered)
    }

    /// Returns the ids of all started devices.
    #[must_use]
    pub fn started_devices(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    /// Returns the number of started devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Returns the number of add-ons waiting for a host.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Returns the subscription index.
    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionIndex {
        &self.index
    }

    /// Returns the ledger of unclaimed announcements.
    #[must_use]
    pub fn discovered(&self) -> &DiscoveredLedger {
        &self.ledger
    }

    /// Returns the number of messages waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inbox.len()
    }

    /// Returns `true` if at least one device broker is reachable.
    ///
    /// Without started devices this only reflects whether anything could
    /// be processed at all, so it reports `true`.
    #[must_use]
    pub fn brokers_available(&self) -> bool {
        let mut brokers = self.devices.values().map(|device| device.binding().broker_id).peekable();
        if brokers.peek().is_none() {
            return true;
        }
        brokers.any(|broker_id| self.transport.is_available(broker_id))
    }

    // ========== Actions ==========

    /// Encodes an action for a started device and publishes it.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for unknown ids,
    /// `DeviceError::NotStarted` for known devices that are not started and
    /// the device's own error when it does not support the action.
    pub fn send_action(&mut self, device_id: DeviceId, action: &Action) -> Result<(), Error> {
        let Some(device) = self.devices.get_mut(&device_id) else {
            return Err(if self.lifecycle.contains_key(&device_id) {
                DeviceError::NotStarted.into()
            } else {
                Error::DeviceNotFound
            });
        };
        let reaction = device.handle_action(action)?;
        device.log().info(format_args!("Sent {}", action.name()));
        self.apply_reaction(device_id, reaction);
        Ok(())
    }

    // ========== Internals ==========

    /// Publishes a reaction's commands and reports its state changes.
    pub(super) fn apply_reaction(&self, device_id: DeviceId, reaction: Reaction) {
        let Reaction { changes, outbox } = reaction;
        self.publish_all(&outbox);
        self.report_changes(device_id, changes);
    }

    pub(super) fn report_changes(&self, device_id: DeviceId, changes: Vec<StateChange>) {
        if changes.is_empty() {
            return;
        }
        let Some(device) = self.devices.get(&device_id) else {
            return;
        };
        self.event_bus.publish(DeviceEvent::StateChanged {
            device_id,
            changes,
            new_state: device.state.clone(),
        });
    }

    /// Hands messages to the transport, logging failures.
    pub(super) fn publish_all(&self, messages: &[OutboundMessage]) {
        for message in messages {
            if let Err(e) = self.transport.publish(message) {
                tracing::warn!(
                    broker = message.broker_id,
                    topic = %message.topic,
                    error = %e,
                    "Failed to publish"
                );
            }
        }
    }

    pub(super) fn set_lifecycle(&mut self, device_id: DeviceId, state: LifecycleState) {
        self.lifecycle.insert(device_id, state);
    }
}

impl fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceManager")
            .field("config", &self.config)
            .field("devices", &self.devices.len())
            .field("pending", &self.pending_count())
            .field("discovered", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::StartOutcome;
    use crate::protocol::MemoryTransport;
    use crate::state::StateKey;

    fn manager() -> (DeviceManager, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let manager = DeviceManager::new(ManagerConfig::default(), transport.clone(), Inbox::new());
        (manager, transport)
    }

    #[test]
    fn discovery_types_are_registered() {
        let (manager, _) = manager();
        assert!(manager.inbox.registry().contains("mqtt"));
    }

    #[test]
    fn send_action_to_unknown_device() {
        let (mut manager, _) = manager();
        let err = manager.send_action(DeviceId::new(), &Action::On).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound));
    }

    #[test]
    fn send_action_to_stopped_device() {
        let (mut manager, _) = manager();
        let config = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/test");
        let id = config.id;
        manager.start_device(config).unwrap();
        manager.stop_device(id).unwrap();

        let err = manager.send_action(id, &Action::On).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::NotStarted)));
    }

    #[test]
    fn send_action_publishes() {
        let (mut manager, transport) = manager();
        let config = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/test");
        let id = config.id;
        assert_eq!(manager.start_device(config).unwrap(), StartOutcome::Started);
        transport.take_published();

        manager.send_action(id, &Action::Off).unwrap();
        let published = transport.take_published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "shellies/test/relay/0/command");
        assert_eq!(published[0].payload, "off");
    }

    #[test]
    fn unsupported_action_is_reported() {
        let (mut manager, transport) = manager();
        let config = DeviceConfig::new("shellyht").with_broker(1).with_address("shellies/ht");
        let id = config.id;
        manager.start_device(config).unwrap();
        transport.take_published();

        let err = manager.send_action(id, &Action::On).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::UnsupportedAction { .. })));
        assert!(transport.published().is_empty());
    }

    #[test]
    fn availability_follows_device_brokers() {
        let (mut manager, transport) = manager();
        assert!(manager.brokers_available());

        manager
            .start_device(DeviceConfig::new("shelly1").with_broker(3).with_address("shellies/a"))
            .unwrap();
        transport.set_available(3, false);
        assert!(!manager.brokers_available());
        transport.set_available(3, true);
        assert!(manager.brokers_available());
    }

    #[test]
    fn state_outlives_stop() {
        let (mut manager, _) = manager();
        let config = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/test");
        let id = config.id;
        manager.start_device(config).unwrap();
        let reaction = manager.devices.get_mut(&id).unwrap().handle_message("shellies/test/relay/0", "on");
        manager.apply_reaction(id, reaction);

        manager.stop_device(id).unwrap();
        assert_eq!(manager.state(id).and_then(|s| s.bool(StateKey::On)), Some(true));
    }
}
