// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a device instance.
///
/// Hosts usually persist their own identifiers; [`DeviceId::from_uuid`] and
/// the `FromStr` impl accept them, [`DeviceId::new`] mints a fresh one.
///
/// Ordered so listener sets iterate deterministically.
///
/// # Examples
///
/// ```
/// use shellor_lib::event::DeviceId;
///
/// let id: DeviceId = "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8".parse().unwrap();
/// assert_eq!(id.to_string(), "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Creates a new unique device identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a device identifier from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show only first 8 characters for readability
        let short = &self.0.simple().to_string()[..8];
        write!(f, "DeviceId({short}...)")
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_unique_ids() {
        assert_ne!(DeviceId::new(), DeviceId::new());
    }

    #[test]
    fn from_uuid_round_trip() {
        let uuid = Uuid::new_v4();
        assert_eq!(DeviceId::from_uuid(uuid).as_uuid(), uuid);
    }

    #[test]
    fn debug_format_is_short() {
        let debug = format!("{:?}", DeviceId::new());
        assert!(debug.starts_with("DeviceId("));
        assert!(debug.ends_with("...)"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<DeviceId>().is_err());
    }

    #[test]
    fn ordering_follows_uuid() {
        let low: DeviceId = "00000000-0000-4000-8000-000000000001".parse().unwrap();
        let high: DeviceId = "00000000-0000-4000-8000-000000000002".parse().unwrap();
        assert!(low < high);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: DeviceId = "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8\""
        );
    }
}
