// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-level commands on `<address>/command`.

use crate::command::Command;

/// Device-wide command.
///
/// # Examples
///
/// ```
/// use shellor_lib::command::{Command, DeviceCommand};
///
/// assert_eq!(DeviceCommand::Update.topic("shellies/ht"), "shellies/ht/command");
/// assert_eq!(DeviceCommand::UpdateFirmware.payload(), "update_fw");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Republish all status topics.
    Update,
    /// Publish an announcement.
    Announce,
    /// Install the pending firmware.
    UpdateFirmware,
}

impl Command for DeviceCommand {
    fn topic_suffix(&self) -> String {
        "command".to_string()
    }

    fn payload(&self) -> String {
        match self {
            Self::Update => "update",
            Self::Announce => "announce",
            Self::UpdateFirmware => "update_fw",
        }
        .to_string()
    }
}
