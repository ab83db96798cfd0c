// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device and manager configuration types.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, Error};
use crate::event::{DEFAULT_EVENT_CAPACITY, DeviceId};
use crate::model::{ConfigValues, validate_config};
use crate::protocol::{BrokerId, MQTT_MESSAGE_TYPE};
use crate::types::TemperatureSettings;

/// Configuration record of one device instance.
///
/// # Examples
///
/// ```
/// use shellor_lib::manager::DeviceConfig;
/// use shellor_lib::types::{TemperatureConversion, TemperatureSettings};
///
/// // A relay on broker 1
/// let relay = DeviceConfig::new("shelly1pm")
///     .with_broker(1)
///     .with_address("shellies/shelly1pm-AABBCC/")
///     .with_name("Boiler");
/// assert_eq!(relay.address, "shellies/shelly1pm-AABBCC");
///
/// // An add-on probe riding on the relay
/// let probe = DeviceConfig::addon("addon-temperature", relay.id)
///     .with_channel(1)
///     .with_temperature(TemperatureSettings {
///         conversion: TemperatureConversion::CelsiusToFahrenheit,
///         ..TemperatureSettings::default()
///     });
/// assert_eq!(probe.host_id, Some(relay.id));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable identifier.
    #[serde(default)]
    pub id: DeviceId,
    /// Device-type tag selecting the model.
    pub device_type: String,
    /// Broker the device lives on (add-ons use their host's).
    #[serde(default)]
    pub broker_id: Option<BrokerId>,
    /// Topic root, without trailing slash.
    #[serde(default, deserialize_with = "deserialize_address")]
    pub address: String,
    /// Channel index.
    #[serde(default)]
    pub channel: u8,
    /// Message-type tags the device listens to.
    #[serde(default = "default_message_types")]
    pub message_types: Vec<String>,
    /// Temperature display preferences.
    #[serde(default)]
    pub temperature: TemperatureSettings,
    /// Additive humidity calibration, in percent.
    #[serde(default)]
    pub humidity_offset: f64,
    /// Hardware id of the probe on a multi-probe bus.
    #[serde(default)]
    pub probe_id: Option<String>,
    /// Host device of an add-on.
    #[serde(default)]
    pub host_id: Option<DeviceId>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Suppresses info and debug logging for this device.
    #[serde(default)]
    pub muted: bool,
}

fn default_message_types() -> Vec<String> {
    vec![MQTT_MESSAGE_TYPE.to_string()]
}

fn deserialize_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_address(&raw))
}

/// Trims whitespace and trailing slashes from a topic root.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}

impl DeviceConfig {
    /// Creates a configuration with a fresh id and default settings.
    #[must_use]
    pub fn new(device_type: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(),
            device_type: device_type.into(),
            broker_id: None,
            address: String::new(),
            channel: 0,
            message_types: default_message_types(),
            temperature: TemperatureSettings::default(),
            humidity_offset: 0.0,
            probe_id: None,
            host_id: None,
            name: None,
            muted: false,
        }
    }

    /// Creates an add-on configuration bound to a host device.
    #[must_use]
    pub fn addon(device_type: impl Into<String>, host_id: DeviceId) -> Self {
        Self {
            host_id: Some(host_id),
            ..Self::new(device_type)
        }
    }

    /// Builds a configuration from the raw strings of a host form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` with every rejected field if validation
    /// fails.
    pub fn from_values(id: DeviceId, values: &ConfigValues) -> Result<Self, Error> {
        let validation = validate_config(values);
        if !validation.valid {
            return Err(ConfigError::InvalidFields(validation.field_errors).into());
        }
        let mut config = validation.into_config()?;
        config.id = id;
        Ok(config)
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: DeviceId) -> Self {
        self.id = id;
        self
    }

    /// Sets the broker.
    #[must_use]
    pub fn with_broker(mut self, broker_id: BrokerId) -> Self {
        self.broker_id = Some(broker_id);
        self
    }

    /// Sets the topic root, stripping any trailing slash.
    #[must_use]
    pub fn with_address(mut self, address: impl AsRef<str>) -> Self {
        self.address = normalize_address(address.as_ref());
        self
    }

    /// Sets the channel index.
    #[must_use]
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Replaces the message-type tags.
    #[must_use]
    pub fn with_message_types<I, S>(mut self, message_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_types = message_types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the temperature display preferences.
    #[must_use]
    pub fn with_temperature(mut self, settings: TemperatureSettings) -> Self {
        self.temperature = settings;
        self
    }

    /// Sets the humidity calibration offset.
    #[must_use]
    pub fn with_humidity_offset(mut self, offset: f64) -> Self {
        self.humidity_offset = offset;
        self
    }

    /// Sets the probe hardware id on a multi-probe bus.
    #[must_use]
    pub fn with_probe(mut self, probe_id: impl Into<String>) -> Self {
        self.probe_id = Some(probe_id.into());
        self
    }

    /// Sets a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mutes info and debug logging for this device.
    #[must_use]
    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// Returns `true` for add-on configurations.
    #[must_use]
    pub fn is_addon(&self) -> bool {
        self.host_id.is_some()
    }

    /// Returns the name used in log lines.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None if !self.address.is_empty() => format!("{}:{}", self.address, self.channel),
            None => self.id.to_string(),
        }
    }
}

/// Configuration of the device manager and its dispatch loop.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use shellor_lib::manager::ManagerConfig;
///
/// let config = ManagerConfig::default()
///     .with_poll_interval(Duration::from_millis(50))
///     .with_max_batch(500);
/// assert_eq!(config.max_batch, Some(500));
/// assert_eq!(config.announce_topic, "shellies/announce");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Pause between two drains of the pending queue.
    pub poll_interval: Duration,
    /// Pause while the transport reports no broker available.
    pub unavailable_backoff: Duration,
    /// Most messages handled per drain; `None` drains everything queued.
    pub max_batch: Option<usize>,
    /// Topic carrying device announcements.
    pub announce_topic: String,
    /// Message types on which announcements are accepted.
    pub discovery_message_types: Vec<String>,
    /// Mirror every device topic as a transport subscription.
    ///
    /// Off by default: brokers subscribe to a wildcard root instead.
    pub subscribe_per_topic: bool,
    /// Capacity of the event bus.
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            unavailable_backoff: Duration::from_secs(5),
            max_batch: None,
            announce_topic: "shellies/announce".to_string(),
            discovery_message_types: default_message_types(),
            subscribe_per_topic: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ManagerConfig {
    /// Sets the polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the back-off used while no broker is available.
    #[must_use]
    pub fn with_unavailable_backoff(mut self, backoff: Duration) -> Self {
        self.unavailable_backoff = backoff;
        self
    }

    /// Bounds the number of messages handled per drain.
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = Some(max_batch.max(1));
        self
    }

    /// Sets the announcement topic.
    #[must_use]
    pub fn with_announce_topic(mut self, topic: impl Into<String>) -> Self {
        self.announce_topic = topic.into();
        self
    }

    /// Enables per-topic transport subscriptions.
    #[must_use]
    pub fn with_subscribe_per_topic(mut self, enabled: bool) -> Self {
        self.subscribe_per_topic = enabled;
        self
    }

    /// Sets the event bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_normalized() {
        let config = DeviceConfig::new("shelly1").with_address(" shellies/test// ");
        assert_eq!(config.address, "shellies/test");
    }

    #[test]
    fn new_config_defaults() {
        let config = DeviceConfig::new("shellyht");
        assert_eq!(config.channel, 0);
        assert_eq!(config.message_types, vec!["mqtt".to_string()]);
        assert!(!config.is_addon());
        assert!(!config.muted);
    }

    #[test]
    fn deserialize_fills_defaults_and_strips_slash() {
        let json = r#"{"device_type":"shelly1","broker_id":2,"address":"shellies/test/"}"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.address, "shellies/test");
        assert_eq!(config.broker_id, Some(2));
        assert_eq!(config.message_types, vec!["mqtt".to_string()]);
        assert_eq!(config.temperature.decimals, 1);
    }

    #[test]
    fn label_prefers_name_then_address() {
        let config = DeviceConfig::new("shelly1").with_address("shellies/a").with_channel(1);
        assert_eq!(config.label(), "shellies/a:1");
        assert_eq!(config.with_name("Porch").label(), "Porch");
    }

    #[test]
    fn manager_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.unavailable_backoff, Duration::from_secs(5));
        assert!(config.max_batch.is_none());
        assert!(!config.subscribe_per_topic);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn zero_batch_is_raised() {
        assert_eq!(ManagerConfig::default().with_max_batch(0).max_batch, Some(1));
    }
}
