// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for announce messages.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A device announcement from `shellies/announce`.
///
/// Only `id` is required; the rest is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Device identifier, e.g. `shellyplug-s-AABBCC`.
    pub id: String,
    /// Hardware model code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// MAC address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Running firmware version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw_ver: Option<String>,
    /// Whether a firmware update is available.
    #[serde(default)]
    pub new_fw: bool,
}

#[derive(Deserialize)]
struct RawAnnouncement {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    mac: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    fw_ver: Option<String>,
    #[serde(default)]
    new_fw: Option<bool>,
}

impl Announcement {
    /// Parses an announce payload.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` for malformed JSON and
    /// `ParseError::MissingField` if `id` is absent or empty.
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        let raw: RawAnnouncement = serde_json::from_str(payload)?;
        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ParseError::MissingField("id".to_string()))?;
        Ok(Self {
            id,
            model: raw.model,
            mac: raw.mac,
            ip: raw.ip,
            fw_ver: raw.fw_ver,
            new_fw: raw.new_fw.unwrap_or(false),
        })
    }
}
