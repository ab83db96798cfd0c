// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker and topic to listening devices.

use std::collections::{BTreeSet, HashMap};

use crate::event::DeviceId;
use crate::protocol::BrokerId;

/// Routing table from `(broker, topic)` to the devices listening on it.
///
/// Entries exist only while they have listeners, so adding and then
/// removing the same topics leaves the index exactly as before.
///
/// # Examples
///
/// ```
/// use shellor_lib::event::DeviceId;
/// use shellor_lib::manager::SubscriptionIndex;
///
/// let mut index = SubscriptionIndex::new();
/// let device = DeviceId::new();
/// let topics = vec!["shellies/plug/relay/0".to_string()];
///
/// index.add(1, device, &topics);
/// assert_eq!(index.listeners(1, "shellies/plug/relay/0"), vec![device]);
///
/// index.remove(1, device, &topics);
/// assert!(index.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionIndex {
    brokers: HashMap<BrokerId, HashMap<String, BTreeSet<DeviceId>>>,
}

impl SubscriptionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device on each topic.
    ///
    /// Returns the topics that had no listener before.
    pub fn add(&mut self, broker_id: BrokerId, device_id: DeviceId, topics: &[String]) -> Vec<String> {
        if topics.is_empty() {
            return Vec::new();
        }
        let broker = self.brokers.entry(broker_id).or_default();
        let mut created = Vec::new();
        for topic in topics {
            let listeners = broker.entry(topic.clone()).or_default();
            if listeners.is_empty() {
                created.push(topic.clone());
            }
            listeners.insert(device_id);
        }
        created
    }

    /// Unregisters a device from each topic, pruning empty entries.
    ///
    /// Returns the topics left without listeners.
    pub fn remove(&mut self, broker_id: BrokerId, device_id: DeviceId, topics: &[String]) -> Vec<String> {
        let Some(broker) = self.brokers.get_mut(&broker_id) else {
            return Vec::new();
        };
        let mut emptied = Vec::new();
        for topic in topics {
            if let Some(listeners) = broker.get_mut(topic) {
                listeners.remove(&device_id);
                if listeners.is_empty() {
                    broker.remove(topic);
                    emptied.push(topic.clone());
                }
            }
        }
        if broker.is_empty() {
            self.brokers.remove(&broker_id);
        }
        emptied
    }

    /// Returns the devices listening on a topic, in id order.
    #[must_use]
    pub fn listeners(&self, broker_id: BrokerId, topic: &str) -> Vec<DeviceId> {
        self.brokers
            .get(&broker_id)
            .and_then(|broker| broker.get(topic))
            .map(|listeners| listeners.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the number of topics with listeners on a broker.
    #[must_use]
    pub fn topic_count(&self, broker_id: BrokerId) -> usize {
        self.brokers.get(&broker_id).map_or(0, HashMap::len)
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }
}
