// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveredDevice;
use crate::protocol::BrokerId;
use crate::state::{DeviceState, StateChange};

use super::DeviceId;

/// Events emitted by the device manager.
///
/// This is how the host state store learns about lifecycle transitions,
/// decoded state updates and unclaimed announcements.
///
/// # Examples
///
/// ```
/// use shellor_lib::event::{DeviceEvent, DeviceId};
///
/// let device_id = DeviceId::new();
/// let started = DeviceEvent::Started { device_id };
/// assert!(started.is_lifecycle());
/// assert_eq!(started.device_id(), Some(device_id));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// The device subscribed and requested a status refresh.
    Started {
        /// The started device.
        device_id: DeviceId,
    },

    /// The device waits for its host device to start.
    Pending {
        /// The waiting add-on.
        device_id: DeviceId,
        /// The host it waits for.
        host_id: DeviceId,
    },

    /// The device stopped listening.
    Stopped {
        /// The stopped device.
        device_id: DeviceId,
    },

    /// The device could not be started and will not be retried.
    StartFailed {
        /// The failed device.
        device_id: DeviceId,
        /// Why the start failed.
        reason: String,
    },

    /// The device was forgotten by the manager.
    Removed {
        /// The removed device.
        device_id: DeviceId,
    },

    /// Decoded messages changed the device state.
    StateChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// Changes applied by one message, in order.
        changes: Vec<StateChange>,
        /// The complete new state of the device.
        new_state: DeviceState,
    },

    /// An announce arrived for a device nobody manages.
    Discovered {
        /// Broker the announce arrived on.
        broker_id: BrokerId,
        /// The ledger entry.
        device: DiscoveredDevice,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    ///
    /// `Discovered` events concern unmanaged devices and have none.
    #[must_use]
    pub fn device_id(&self) -> Option<DeviceId> {
        match self {
            Self::Started { device_id }
            | Self::Pending { device_id, .. }
            | Self::Stopped { device_id }
            | Self::StartFailed { device_id, .. }
            | Self::Removed { device_id }
            | Self::StateChanged { device_id, .. } => Some(*device_id),
            Self::Discovered { .. } => None,
        }
    }

    /// Returns `true` if this is a lifecycle transition.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::Started { .. }
                | Self::Pending { .. }
                | Self::Stopped { .. }
                | Self::StartFailed { .. }
                | Self::Removed { .. }
        )
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateKey, StateValue};

    #[test]
    fn state_change_event_accessors() {
        let device_id = DeviceId::new();
        let event = DeviceEvent::StateChanged {
            device_id,
            changes: vec![StateChange {
                key: StateKey::On,
                previous: None,
                value: StateValue::Bool(true),
            }],
            new_state: DeviceState::new(),
        };
        assert!(event.is_state_change());
        assert!(!event.is_lifecycle());
        assert_eq!(event.device_id(), Some(device_id));
    }

    #[test]
    fn pending_is_lifecycle() {
        let event = DeviceEvent::Pending {
            device_id: DeviceId::new(),
            host_id: DeviceId::new(),
        };
        assert!(event.is_lifecycle());
    }

    #[test]
    fn serializes_with_event_tag() {
        let device_id: DeviceId = "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8".parse().unwrap();
        let json = serde_json::to_string(&DeviceEvent::Stopped { device_id }).unwrap();
        assert_eq!(
            json,
            r#"{"event":"stopped","device_id":"a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8"}"#
        );
    }
}
