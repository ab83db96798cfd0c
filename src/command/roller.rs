// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Roller shutter commands.

use crate::command::Command;
use crate::types::Percent;

/// Command to move a roller.
///
/// # Examples
///
/// ```
/// use shellor_lib::command::{Command, RollerCommand};
/// use shellor_lib::types::Percent;
///
/// assert_eq!(RollerCommand::Open { channel: 0 }.payload(), "open");
///
/// let cmd = RollerCommand::Position { channel: 0, position: Percent::clamped(40) };
/// assert_eq!(cmd.topic_suffix(), "roller/0/command/pos");
/// assert_eq!(cmd.payload(), "40");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollerCommand {
    /// Open fully.
    Open {
        /// Roller channel.
        channel: u8,
    },
    /// Close fully.
    Close {
        /// Roller channel.
        channel: u8,
    },
    /// Stop moving.
    Stop {
        /// Roller channel.
        channel: u8,
    },
    /// Move to a calibrated position.
    Position {
        /// Roller channel.
        channel: u8,
        /// Target position.
        position: Percent,
    },
}

impl Command for RollerCommand {
    fn topic_suffix(&self) -> String {
        match self {
            Self::Open { channel } | Self::Close { channel } | Self::Stop { channel } => {
                format!("roller/{channel}/command")
            }
            Self::Position { channel, .. } => format!("roller/{channel}/command/pos"),
        }
    }

    fn payload(&self) -> String {
        match self {
            Self::Open { .. } => "open".to_string(),
            Self::Close { .. } => "close".to_string(),
            Self::Stop { .. } => "stop".to_string(),
            Self::Position { position, .. } => position.value().to_string(),
        }
    }
}
