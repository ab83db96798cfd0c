// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One drain of the pending queue.

use crate::protocol::InboundMessage;

use super::device_manager::DeviceManager;

impl DeviceManager {
    /// Drains the pending queue and routes every message.
    ///
    /// At most [`ManagerConfig::max_batch`](super::ManagerConfig::max_batch)
    /// messages are taken. Each listening device whose message types include
    /// the message's type handles it once, in queue order. Messages on the
    /// announce topic are additionally recorded in the discovered-device
    /// ledger. Nothing a single device does stops the drain.
    ///
    /// Returns the number of messages taken from the queue.
    pub fn process_pending(&mut self) -> usize {
        let batch = self.inbox.drain(self.config.max_batch);
        let taken = batch.len();
        for message in &batch {
            self.dispatch(message);
        }
        if taken > 0 {
            tracing::trace!(messages = taken, "Processed pending messages");
        }
        taken
    }

    fn dispatch(&mut self, message: &InboundMessage) {
        let topic = message.topic();
        let listeners = self.index.listeners(message.broker_id, &topic);

        for device_id in listeners {
            let Some(device) = self.devices.get_mut(&device_id) else {
                continue;
            };
            if !device.accepts(&message.message_type) {
                continue;
            }
            let reaction = device.handle_message(&topic, &message.payload);
            self.apply_reaction(device_id, reaction);
        }

        if topic == self.config.announce_topic
            && self.config.discovery_message_types.contains(&message.message_type)
            && let Err(e) = self.process_announcement(message.broker_id, &message.payload)
        {
            tracing::warn!(broker = message.broker_id, error = %e, "Dropping malformed announcement");
        }
    }
}
