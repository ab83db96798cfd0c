// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Announce-driven discovery bookkeeping.
//!
//! Shelly devices publish an [`Announcement`] on `shellies/announce` when
//! they boot or when asked to. Announcements from devices that no managed
//! device claims are kept in a [`DiscoveredLedger`] so an operator can see
//! what is on the broker but not configured yet.
//!
//! A managed device claims an announced id when its configured address
//! contains that id, e.g. address `shellies/shellyplug-s-C4D8D5` claims
//! `shellyplug-s-C4D8D5`.
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use shellor_lib::discovery::DiscoveredLedger;
//! use shellor_lib::telemetry::Announcement;
//!
//! let mut ledger = DiscoveredLedger::new();
//! let announce = Announcement::parse(r#"{"id":"shellyht-0A1B2C","ip":"10.0.0.9"}"#).unwrap();
//! ledger.upsert(1, announce, Utc::now());
//! assert_eq!(ledger.len(), 1);
//!
//! // Configuring the device purges the entry.
//! ledger.purge_claimed(1, "shellies/shellyht-0A1B2C");
//! assert!(ledger.is_empty());
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::BrokerId;
use crate::telemetry::Announcement;

/// A device seen on the broker but not managed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Last announcement received.
    pub announcement: Announcement,
    /// When the id was first announced.
    pub first_seen: DateTime<Utc>,
    /// When the last announcement arrived.
    pub last_seen: DateTime<Utc>,
}

impl DiscoveredDevice {
    /// Returns the announced device id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.announcement.id
    }
}

/// Per-broker ledger of unclaimed announcements.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredLedger {
    brokers: HashMap<BrokerId, BTreeMap<String, DiscoveredDevice>>,
}

impl DiscoveredLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an announcement, keeping the first-seen time of known ids.
    ///
    /// Returns `true` if the id was not in the ledger before.
    pub fn upsert(&mut self, broker_id: BrokerId, announcement: Announcement, now: DateTime<Utc>) -> bool {
        let devices = self.brokers.entry(broker_id).or_default();
        match devices.get_mut(&announcement.id) {
            Some(existing) => {
                existing.announcement = announcement;
                existing.last_seen = now;
                false
            }
            None => {
                devices.insert(
                    announcement.id.clone(),
                    DiscoveredDevice {
                        announcement,
                        first_seen: now,
                        last_seen: now,
                    },
                );
                true
            }
        }
    }

    /// Removes one id from a broker's ledger.
    pub fn purge(&mut self, broker_id: BrokerId, id: &str) -> Option<DiscoveredDevice> {
        let devices = self.brokers.get_mut(&broker_id)?;
        let removed = devices.remove(id);
        if devices.is_empty() {
            self.brokers.remove(&broker_id);
        }
        removed
    }

    /// Removes every id that `address` contains.
    ///
    /// Returns the purged entries.
    pub fn purge_claimed(&mut self, broker_id: BrokerId, address: &str) -> Vec<DiscoveredDevice> {
        if address.is_empty() {
            return Vec::new();
        }
        let Some(devices) = self.brokers.get_mut(&broker_id) else {
            return Vec::new();
        };
        let claimed: Vec<String> = devices
            .keys()
            .filter(|id| address.contains(id.as_str()))
            .cloned()
            .collect();
        let purged = claimed.iter().filter_map(|id| devices.remove(id)).collect();
        if devices.is_empty() {
            self.brokers.remove(&broker_id);
        }
        purged
    }

    /// Returns one entry.
    #[must_use]
    pub fn get(&self, broker_id: BrokerId, id: &str) -> Option<&DiscoveredDevice> {
        self.brokers.get(&broker_id)?.get(id)
    }

    /// Returns the entries of one broker, ordered by id.
    pub fn devices(&self, broker_id: BrokerId) -> impl Iterator<Item = &DiscoveredDevice> {
        self.brokers.get(&broker_id).into_iter().flat_map(BTreeMap::values)
    }

    /// Returns the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.brokers.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if no broker has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.brokers.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn announce(id: &str, ip: &str) -> Announcement {
        Announcement::parse(&format!(r#"{{"id":"{id}","ip":"{ip}"}}"#)).unwrap()
    }

    #[test]
    fn upsert_keeps_first_seen() {
        let mut ledger = DiscoveredLedger::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap();

        assert!(ledger.upsert(1, announce("shelly1-AA", "10.0.0.2"), t0));
        assert!(!ledger.upsert(1, announce("shelly1-AA", "10.0.0.3"), t1));

        let entry = ledger.get(1, "shelly1-AA").unwrap();
        assert_eq!(entry.first_seen, t0);
        assert_eq!(entry.last_seen, t1);
        assert_eq!(entry.announcement.ip.as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn brokers_are_separate() {
        let mut ledger = DiscoveredLedger::new();
        let now = Utc::now();
        ledger.upsert(1, announce("shelly1-AA", "a"), now);
        ledger.upsert(2, announce("shelly1-AA", "b"), now);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.purge(1, "shelly1-AA").is_some());
        assert!(ledger.get(1, "shelly1-AA").is_none());
        assert!(ledger.get(2, "shelly1-AA").is_some());
    }

    #[test]
    fn purge_claimed_matches_substring() {
        let mut ledger = DiscoveredLedger::new();
        let now = Utc::now();
        ledger.upsert(1, announce("shellyht-0A1B2C", "a"), now);
        ledger.upsert(1, announce("shellydw2-99", "b"), now);

        let purged = ledger.purge_claimed(1, "shellies/shellyht-0A1B2C");
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id(), "shellyht-0A1B2C");
        let remaining: Vec<_> = ledger.devices(1).map(DiscoveredDevice::id).collect();
        assert_eq!(remaining, ["shellydw2-99"]);
    }

    #[test]
    fn empty_address_claims_nothing() {
        let mut ledger = DiscoveredLedger::new();
        ledger.upsert(1, announce("x", "a"), Utc::now());
        assert!(ledger.purge_claimed(1, "").is_empty());
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
