// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device models.
//!
//! A device model is an ordered chain of small [`Behavior`]s (switch,
//! energy meter, light, battery, thermometer, ...). Each behavior owns a
//! static table mapping topic suffixes to decode functions. An inbound
//! message is offered to each behavior in turn; the first one that
//! recognizes the suffix handles it, the others never see it.
//!
//! The [`CATALOG`] maps device-type tags to the behavior chain of each
//! model.
//!
//! # Examples
//!
//! ```
//! use shellor_lib::model::lookup;
//!
//! let entry = lookup("shelly1pm").unwrap();
//! assert_eq!(entry.name, "Shelly 1PM");
//! assert!(!entry.addon);
//! assert!(lookup("toaster").is_err());
//! ```

mod behaviors;
mod catalog;
mod validation;

pub use catalog::{BuildChain, CATALOG, CatalogEntry, lookup};
pub use validation::{ConfigValidation, ConfigValues, fields, validate_config};

use std::fmt;

use crate::command::{Action, Command};
use crate::error::ParseError;
use crate::manager::DeviceConfig;
use crate::protocol::{BrokerId, OutboundMessage};
use crate::state::{DeviceState, StateChange, StateKey, StateValue};

/// Broker, address and message types a device is reachable on.
///
/// Add-ons inherit all three from their host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBinding {
    /// Broker carrying the device's topics.
    pub broker_id: BrokerId,
    /// Topic root.
    pub address: String,
    /// Message-type tags the device listens to.
    pub message_types: Vec<String>,
}

impl DeviceBinding {
    /// Returns the full topic of a suffix, or `None` without an address.
    #[must_use]
    pub fn topic(&self, suffix: &str) -> Option<String> {
        if self.address.is_empty() {
            return None;
        }
        Some(format!("{}/{suffix}", self.address))
    }

    /// Returns the suffix of a full topic below this address.
    #[must_use]
    pub fn suffix<'t>(&self, topic: &'t str) -> Option<&'t str> {
        if self.address.is_empty() {
            return None;
        }
        topic.strip_prefix(self.address.as_str())?.strip_prefix('/')
    }
}

/// Per-device logger honoring the `muted` flag.
///
/// Muting suppresses info and debug lines; warnings and errors always pass.
#[derive(Debug, Clone)]
pub struct DeviceLog {
    label: String,
    muted: bool,
}

impl DeviceLog {
    /// Creates a logger for a device.
    #[must_use]
    pub fn new(label: impl Into<String>, muted: bool) -> Self {
        Self {
            label: label.into(),
            muted,
        }
    }

    /// Returns the device label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Logs at debug level unless muted.
    pub fn debug(&self, message: fmt::Arguments<'_>) {
        if !self.muted {
            tracing::debug!(device = %self.label, "{message}");
        }
    }

    /// Logs at info level unless muted.
    pub fn info(&self, message: fmt::Arguments<'_>) {
        if !self.muted {
            tracing::info!(device = %self.label, "{message}");
        }
    }

    /// Logs at warn level.
    pub fn warn(&self, message: fmt::Arguments<'_>) {
        tracing::warn!(device = %self.label, "{message}");
    }

    /// Logs at error level.
    pub fn error(&self, message: fmt::Arguments<'_>) {
        tracing::error!(device = %self.label, "{message}");
    }
}

/// Everything a behavior may touch while handling one message or action.
pub struct DeviceContext<'a> {
    config: &'a DeviceConfig,
    binding: &'a DeviceBinding,
    state: &'a mut DeviceState,
    changes: &'a mut Vec<StateChange>,
    outbox: &'a mut Vec<OutboundMessage>,
    log: &'a DeviceLog,
}

impl<'a> DeviceContext<'a> {
    pub(crate) fn new(
        config: &'a DeviceConfig,
        binding: &'a DeviceBinding,
        state: &'a mut DeviceState,
        changes: &'a mut Vec<StateChange>,
        outbox: &'a mut Vec<OutboundMessage>,
        log: &'a DeviceLog,
    ) -> Self {
        Self {
            config,
            binding,
            state,
            changes,
            outbox,
            log,
        }
    }

    /// Returns the device configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        self.config
    }

    /// Returns the configured channel.
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        self.state
    }

    /// Returns the device logger.
    #[must_use]
    pub fn log(&self) -> &DeviceLog {
        self.log
    }

    /// Writes a state field, recording the change if the value differs.
    pub fn set(&mut self, key: StateKey, value: impl Into<StateValue>) {
        if let Some(change) = self.state.set(key, value) {
            self.changes.push(change);
        }
    }

    /// Queues a command for publishing under the device address.
    pub fn send(&mut self, command: &impl Command) {
        let Some(topic) = self.binding.topic(&command.topic_suffix()) else {
            self.log
                .warn(format_args!("No address configured, dropping {}", command.topic_suffix()));
            return;
        };
        self.outbox
            .push(OutboundMessage::new(self.binding.broker_id, topic, command.payload()));
    }
}

/// Outcome of offering a message or action to a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Recognized and applied.
    Applied,
    /// Recognized but the payload was rejected; state is unchanged.
    Rejected,
    /// Not recognized; the next behavior in the chain is tried.
    Ignored,
}

impl Handled {
    /// Returns `true` unless the input was ignored.
    #[must_use]
    pub fn is_recognized(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// One composable piece of a device model.
pub trait Behavior: fmt::Debug + Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Topic suffixes this behavior decodes, below the device address.
    fn topics(&self) -> Vec<String>;

    /// Decodes a message on one of [`topics`](Self::topics).
    fn handle(&mut self, ctx: &mut DeviceContext<'_>, suffix: &str, payload: &str) -> Handled;

    /// Encodes a user action.
    fn action(&mut self, _ctx: &mut DeviceContext<'_>, _action: &Action) -> Handled {
        Handled::Ignored
    }

    /// Contribution to the composite status line.
    fn summary(&self, _state: &DeviceState) -> Option<String> {
        None
    }
}

/// Decode function of a rule.
pub(crate) type Apply<B> = fn(&mut B, &mut DeviceContext<'_>, &str) -> Result<(), ParseError>;

/// A suffix pattern and its decode function.
///
/// Patterns may contain `{p}` (the behavior's topic prefix) and `{ch}`
/// (the channel index).
pub(crate) struct Rule<B> {
    pub pattern: &'static str,
    pub apply: Apply<B>,
}

/// Rules with their patterns expanded for one device.
pub(crate) struct RuleTable<B> {
    entries: Vec<(String, Apply<B>)>,
}

impl<B> RuleTable<B> {
    pub(crate) fn bind(rules: &[Rule<B>], prefix: &str, channel: u8) -> Self {
        let channel = channel.to_string();
        let entries = rules
            .iter()
            .map(|rule| {
                let suffix = rule.pattern.replace("{p}", prefix).replace("{ch}", &channel);
                (suffix, rule.apply)
            })
            .collect();
        Self { entries }
    }

    pub(crate) fn suffixes(&self) -> Vec<String> {
        self.entries.iter().map(|(suffix, _)| suffix.clone()).collect()
    }

    pub(crate) fn find(&self, suffix: &str) -> Option<Apply<B>> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == suffix)
            .map(|(_, apply)| *apply)
    }
}

impl<B> fmt::Debug for RuleTable<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(suffix, _)| suffix))
            .finish()
    }
}

/// Behaviors driven by a [`RuleTable`].
pub(crate) trait RuleSet: Sized {
    fn rules(&self) -> &RuleTable<Self>;
}

/// Looks up `suffix` and runs its decode function.
///
/// A decode error is logged and reported as [`Handled::Rejected`]; decode
/// functions validate before writing so state stays untouched.
pub(crate) fn run_rules<B: RuleSet>(
    behavior: &mut B,
    ctx: &mut DeviceContext<'_>,
    suffix: &str,
    payload: &str,
) -> Handled {
    let Some(apply) = behavior.rules().find(suffix) else {
        return Handled::Ignored;
    };
    match apply(behavior, ctx, payload) {
        Ok(()) => Handled::Applied,
        Err(error) => {
            ctx.log()
                .error(format_args!("Rejected payload on {suffix}: {error}"));
            Handled::Rejected
        }
    }
}
