// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory transport.

use std::collections::{BTreeSet, HashSet};

use parking_lot::Mutex;

use super::{BrokerId, OutboundMessage, Transport};
use crate::error::ProtocolError;

/// A transport that records every request instead of sending it.
///
/// Every broker is known and available unless marked otherwise.
///
/// # Examples
///
/// ```
/// use shellor_lib::protocol::{MemoryTransport, OutboundMessage, Transport};
///
/// let transport = MemoryTransport::new();
/// transport.publish(&OutboundMessage::new(1, "shellies/a/command", "update")).unwrap();
/// assert_eq!(transport.published_topics(), vec!["shellies/a/command"]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    published: Mutex<Vec<OutboundMessage>>,
    subscriptions: Mutex<BTreeSet<(BrokerId, String)>>,
    unavailable: Mutex<HashSet<BrokerId>>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a broker as available or not.
    pub fn set_available(&self, broker_id: BrokerId, available: bool) {
        let mut unavailable = self.unavailable.lock();
        if available {
            unavailable.remove(&broker_id);
        } else {
            unavailable.insert(broker_id);
        }
    }

    /// Returns a copy of all recorded publishes.
    #[must_use]
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.published.lock().clone()
    }

    /// Returns the topics of all recorded publishes.
    #[must_use]
    pub fn published_topics(&self) -> Vec<String> {
        self.published.lock().iter().map(|m| m.topic.clone()).collect()
    }

    /// Removes and returns all recorded publishes.
    pub fn take_published(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.published.lock())
    }

    /// Returns the active subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(BrokerId, String)> {
        self.subscriptions.lock().iter().cloned().collect()
    }

    fn check(&self, broker_id: BrokerId) -> Result<(), ProtocolError> {
        if self.unavailable.lock().contains(&broker_id) {
            return Err(ProtocolError::Unavailable(broker_id));
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn is_available(&self, broker_id: BrokerId) -> bool {
        !self.unavailable.lock().contains(&broker_id)
    }

    fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        self.check(message.broker_id)?;
        self.published.lock().push(message.clone());
        Ok(())
    }

    fn subscribe(&self, broker_id: BrokerId, topic: &str) -> Result<(), ProtocolError> {
        self.check(broker_id)?;
        self.subscriptions.lock().insert((broker_id, topic.to_string()));
        Ok(())
    }

    fn unsubscribe(&self, broker_id: BrokerId, topic: &str) -> Result<(), ProtocolError> {
        self.check(broker_id)?;
        self.subscriptions.lock().remove(&(broker_id, topic.to_string()));
        Ok(())
    }
}
