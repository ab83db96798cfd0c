// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay power commands.

use crate::command::Command;
use crate::types::PowerState;

/// Command to switch a relay channel.
///
/// # Examples
///
/// ```
/// use shellor_lib::command::{Command, RelayCommand};
/// use shellor_lib::types::PowerState;
///
/// let cmd = RelayCommand::new(1, PowerState::Off);
/// assert_eq!(cmd.topic_suffix(), "relay/1/command");
/// assert_eq!(cmd.payload(), "off");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCommand {
    channel: u8,
    state: PowerState,
}

impl RelayCommand {
    /// Creates a relay command.
    #[must_use]
    pub const fn new(channel: u8, state: PowerState) -> Self {
        Self { channel, state }
    }

    /// Returns the target channel.
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Returns the requested state.
    #[must_use]
    pub const fn state(&self) -> PowerState {
        self.state
    }
}

impl Command for RelayCommand {
    fn topic_suffix(&self) -> String {
        format!("relay/{}/command", self.channel)
    }

    fn payload(&self) -> String {
        self.state.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_payloads() {
        assert_eq!(RelayCommand::new(0, PowerState::On).payload(), "on");
        assert_eq!(RelayCommand::new(0, PowerState::Off).payload(), "off");
        assert_eq!(RelayCommand::new(0, PowerState::Toggle).payload(), "toggle");
    }

    #[test]
    fn relay_topic_uses_channel() {
        let cmd = RelayCommand::new(3, PowerState::On);
        assert_eq!(cmd.channel(), 3);
        assert_eq!(cmd.topic("shellies/uni"), "shellies/uni/relay/3/command");
    }
}
