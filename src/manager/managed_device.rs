// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Internal device wrapper for the device manager.

use serde::{Deserialize, Serialize};

use crate::command::Action;
use crate::error::{DeviceError, Error};
use crate::event::DeviceId;
use crate::model::{Behavior, CatalogEntry, DeviceBinding, DeviceContext, DeviceLog, Handled, lookup};
use crate::protocol::OutboundMessage;
use crate::state::{DeviceState, StateChange, StateKey};

use super::device_config::DeviceConfig;

/// Lifecycle state of a configured device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Add-on waiting for its host to start.
    Pending,
    /// Subscribed and handling messages.
    Started,
    /// Configured but not listening.
    Stopped,
    /// Could not be started; needs a configuration change.
    Failed,
}

impl LifecycleState {
    /// Returns true if the device handles messages.
    #[must_use]
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }
}

/// What handling one message or action produced.
#[derive(Debug, Default)]
pub(crate) struct Reaction {
    /// State changes, in application order.
    pub changes: Vec<StateChange>,
    /// Commands to publish.
    pub outbox: Vec<OutboundMessage>,
}

/// A started device: its model chain, binding and state.
pub(crate) struct ManagedDevice {
    pub config: DeviceConfig,
    entry: &'static CatalogEntry,
    binding: DeviceBinding,
    pub state: DeviceState,
    behaviors: Vec<Box<dyn Behavior>>,
    /// Full topics registered in the subscription index, captured at start
    /// so removal uses exactly what was added.
    subscriptions: Vec<String>,
    /// Messages delivered since start.
    delivered: u64,
    log: DeviceLog,
}

impl ManagedDevice {
    /// Builds the model chain for a configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDeviceType` if the tag is not in the catalog.
    pub(crate) fn new(config: DeviceConfig, binding: DeviceBinding, state: DeviceState) -> Result<Self, Error> {
        let entry = lookup(&config.device_type)?;
        let behaviors = (entry.build)(&config);
        let log = DeviceLog::new(config.label(), config.muted);
        let subscriptions = behaviors
            .iter()
            .flat_map(|behavior| behavior.topics())
            .filter_map(|suffix| binding.topic(&suffix))
            .collect();

        Ok(Self {
            config,
            entry,
            binding,
            state,
            behaviors,
            subscriptions,
            delivered: 0,
            log,
        })
    }

    pub(crate) fn id(&self) -> DeviceId {
        self.config.id
    }

    pub(crate) fn model_name(&self) -> &'static str {
        self.entry.name
    }

    pub(crate) fn binding(&self) -> &DeviceBinding {
        &self.binding
    }

    pub(crate) fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered
    }

    pub(crate) fn log(&self) -> &DeviceLog {
        &self.log
    }

    /// Splits the device into the parts that outlive it.
    pub(crate) fn into_parts(self) -> (DeviceConfig, DeviceState) {
        (self.config, self.state)
    }

    /// Returns true if the device listens to a message type.
    pub(crate) fn accepts(&self, message_type: &str) -> bool {
        self.binding.message_types.iter().any(|t| t == message_type)
    }

    /// Offers a message to the behavior chain.
    ///
    /// The first behavior recognizing the suffix handles it. The composite
    /// status is refreshed afterwards, also when the payload was rejected.
    pub(crate) fn handle_message(&mut self, topic: &str, payload: &str) -> Reaction {
        self.delivered += 1;
        let mut reaction = Reaction::default();
        let Some(suffix) = self.binding.suffix(topic) else {
            return reaction;
        };

        let mut handled = Handled::Ignored;
        let mut ctx = DeviceContext::new(
            &self.config,
            &self.binding,
            &mut self.state,
            &mut reaction.changes,
            &mut reaction.outbox,
            &self.log,
        );
        for behavior in &mut self.behaviors {
            handled = behavior.handle(&mut ctx, suffix, payload);
            if handled.is_recognized() {
                self.log.debug(format_args!("{} handled {suffix}", behavior.name()));
                break;
            }
        }

        if handled.is_recognized() {
            self.refresh_status(&mut reaction.changes);
        } else {
            tracing::trace!(device = %self.log.label(), %topic, "No behavior for topic");
        }
        reaction
    }

    /// Encodes a user action through the behavior chain.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedAction` if no behavior encodes the
    /// action and `DeviceError::InvalidArgument` if its argument was refused.
    pub(crate) fn handle_action(&mut self, action: &Action) -> Result<Reaction, DeviceError> {
        let mut reaction = Reaction::default();
        let mut handled = Handled::Ignored;
        let mut ctx = DeviceContext::new(
            &self.config,
            &self.binding,
            &mut self.state,
            &mut reaction.changes,
            &mut reaction.outbox,
            &self.log,
        );
        for behavior in &mut self.behaviors {
            handled = behavior.action(&mut ctx, action);
            if handled.is_recognized() {
                break;
            }
        }

        match handled {
            Handled::Applied => {
                self.refresh_status(&mut reaction.changes);
                Ok(reaction)
            }
            Handled::Rejected => Err(DeviceError::InvalidArgument {
                action: action.name().to_string(),
            }),
            Handled::Ignored => Err(DeviceError::UnsupportedAction {
                action: action.name().to_string(),
            }),
        }
    }

    fn refresh_status(&mut self, changes: &mut Vec<StateChange>) {
        let parts: Vec<String> = self
            .behaviors
            .iter()
            .filter_map(|behavior| behavior.summary(&self.state))
            .collect();
        if parts.is_empty() {
            return;
        }
        if let Some(change) = self.state.set(StateKey::Status, parts.join(" | ")) {
            changes.push(change);
        }
    }
}

impl std::fmt::Debug for ManagedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedDevice")
            .field("id", &self.config.id)
            .field("model", &self.entry.tag)
            .field("binding", &self.binding)
            .field("behaviors", &self.behaviors)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}
