// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation of raw configuration forms.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{ConfigError, Error};
use crate::event::DeviceId;
use crate::manager::{DeviceConfig, normalize_address};
use crate::protocol::{BrokerId, MQTT_MESSAGE_TYPE};
use crate::telemetry::decode;
use crate::types::{TemperatureConversion, TemperatureSettings};

use super::lookup;

/// Raw field values as submitted by a configuration form.
pub type ConfigValues = BTreeMap<String, String>;

/// Field names understood by [`validate_config`].
pub mod fields {
    /// Device-type tag.
    pub const TYPE: &str = "type";
    /// Broker id (non-addons).
    pub const BROKER: &str = "broker";
    /// Topic root.
    pub const ADDRESS: &str = "address";
    /// Channel index.
    pub const CHANNEL: &str = "channel";
    /// Comma-separated message-type tags.
    pub const MESSAGE_TYPES: &str = "message_types";
    /// Temperature conversion tag (`C`, `F`, `C->F`, `F->C`).
    pub const TEMPERATURE_UNIT: &str = "temperature_unit";
    /// Additive temperature offset.
    pub const TEMPERATURE_OFFSET: &str = "temperature_offset";
    /// Rendered decimals.
    pub const DECIMALS: &str = "decimals";
    /// Additive humidity offset.
    pub const HUMIDITY_OFFSET: &str = "humidity_offset";
    /// Probe hardware id.
    pub const PROBE: &str = "probe";
    /// Host device id (addons).
    pub const HOST: &str = "host";
    /// Display name.
    pub const NAME: &str = "name";
    /// Log muting flag.
    pub const MUTED: &str = "muted";
}

/// Result of [`validate_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidation {
    /// `true` when no field was rejected.
    pub valid: bool,
    /// Normalized values with defaults filled in.
    pub values: ConfigValues,
    /// Error message per rejected field.
    pub field_errors: BTreeMap<String, String>,
    config: Option<DeviceConfig>,
}

impl ConfigValidation {
    /// Converts validated values into a device configuration with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` carrying the field errors if validation
    /// failed.
    pub fn into_config(self) -> Result<DeviceConfig, Error> {
        match self.config {
            Some(config) if self.valid => Ok(config),
            _ => Err(ConfigError::InvalidFields(self.field_errors).into()),
        }
    }
}

/// Collects normalized values and per-field errors.
struct Checker<'a> {
    raw: &'a ConfigValues,
    values: ConfigValues,
    errors: BTreeMap<String, String>,
}

impl<'a> Checker<'a> {
    fn new(raw: &'a ConfigValues) -> Self {
        Self {
            raw,
            values: ConfigValues::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Returns the trimmed value, or `None` if missing or blank.
    fn get(&self, field: &str) -> Option<&'a str> {
        self.raw
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.insert(field.to_string(), message.into());
    }

    fn keep(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), value.into());
    }

    /// Parses an optional field, keeping `default` when it is absent.
    fn parse<T>(&mut self, field: &str, default: T, message: &str) -> T
    where
        T: FromStr + ToString,
    {
        match self.get(field) {
            None => {
                self.keep(field, default.to_string());
                default
            }
            Some(raw) => match raw.parse::<T>() {
                Ok(value) => {
                    self.keep(field, value.to_string());
                    value
                }
                Err(_) => {
                    self.reject(field, format!("{message}, got {raw:?}"));
                    default
                }
            },
        }
    }

    fn offset(&mut self, field: &str) -> f64 {
        let value: f64 = self.parse(field, 0.0, "expected a number");
        if !value.is_finite() {
            self.reject(field, "expected a finite number");
            return 0.0;
        }
        value
    }
}

/// Validates and normalizes a raw configuration form.
///
/// Never fails: problems are reported per field in the returned
/// [`ConfigValidation`].
///
/// # Examples
///
/// ```
/// use shellor_lib::model::{ConfigValues, fields, validate_config};
///
/// let mut values = ConfigValues::new();
/// values.insert(fields::TYPE.into(), "shellyht".into());
/// values.insert(fields::BROKER.into(), "1".into());
/// values.insert(fields::ADDRESS.into(), "shellies/shellyht-0A1B2C/".into());
///
/// let validation = validate_config(&values);
/// assert!(validation.valid);
/// assert_eq!(validation.values[fields::ADDRESS], "shellies/shellyht-0A1B2C");
/// assert_eq!(validation.values[fields::CHANNEL], "0");
/// ```
#[must_use]
pub fn validate_config(raw: &ConfigValues) -> ConfigValidation {
    let mut check = Checker::new(raw);

    let device_type = check.get(fields::TYPE).map(str::to_string);
    let addon = match device_type.as_deref() {
        None => {
            check.reject(fields::TYPE, "device type is required");
            false
        }
        Some(tag) => match lookup(tag) {
            Ok(entry) => {
                check.keep(fields::TYPE, tag);
                entry.addon
            }
            Err(_) => {
                check.reject(fields::TYPE, format!("unknown device type {tag:?}"));
                false
            }
        },
    };

    let host_id = match check.get(fields::HOST) {
        Some(raw_host) if addon => match raw_host.parse::<DeviceId>() {
            Ok(id) => {
                check.keep(fields::HOST, raw_host);
                Some(id)
            }
            Err(_) => {
                check.reject(fields::HOST, format!("invalid host id {raw_host:?}"));
                None
            }
        },
        Some(_) if device_type.is_some() && !addon => {
            check.reject(fields::HOST, "only add-ons have a host");
            None
        }
        None if addon => {
            check.reject(fields::HOST, "add-ons require a host device");
            None
        }
        _ => None,
    };

    let broker_id = match check.get(fields::BROKER) {
        Some(raw_broker) => match raw_broker.parse::<BrokerId>() {
            Ok(id) => {
                check.keep(fields::BROKER, raw_broker);
                Some(id)
            }
            Err(_) => {
                check.reject(fields::BROKER, format!("expected a broker id, got {raw_broker:?}"));
                None
            }
        },
        None if !addon && device_type.is_some() => {
            check.reject(fields::BROKER, "a broker is required");
            None
        }
        None => None,
    };

    let address = normalize_address(check.get(fields::ADDRESS).unwrap_or_default());
    check.keep(fields::ADDRESS, address.clone());

    let channel: u8 = check.parse(fields::CHANNEL, 0, "expected a channel index (0-255)");

    let message_types: Vec<String> = match check.get(fields::MESSAGE_TYPES) {
        None => vec![MQTT_MESSAGE_TYPE.to_string()],
        Some(raw_types) => raw_types
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    };
    if message_types.is_empty() {
        check.reject(fields::MESSAGE_TYPES, "at least one message type is required");
    } else {
        check.keep(fields::MESSAGE_TYPES, message_types.join(","));
    }

    let conversion: TemperatureConversion = check.parse(
        fields::TEMPERATURE_UNIT,
        TemperatureConversion::default(),
        "expected C, F, C->F or F->C",
    );
    let temperature_offset = check.offset(fields::TEMPERATURE_OFFSET);
    let humidity_offset = check.offset(fields::HUMIDITY_OFFSET);

    let decimals: u8 = check.parse(fields::DECIMALS, 1, "expected a number of decimals");
    if decimals > TemperatureSettings::MAX_DECIMALS {
        check.reject(
            fields::DECIMALS,
            format!("at most {} decimals", TemperatureSettings::MAX_DECIMALS),
        );
    }

    let muted = match check.get(fields::MUTED) {
        None => false,
        Some(raw_flag) => match decode::parse_flag(fields::MUTED, raw_flag) {
            Ok(flag) => flag,
            Err(_) => {
                check.reject(fields::MUTED, format!("expected a flag, got {raw_flag:?}"));
                false
            }
        },
    };
    check.keep(fields::MUTED, muted.to_string());

    let probe_id = check.get(fields::PROBE).map(str::to_string);
    if let Some(probe) = &probe_id {
        check.keep(fields::PROBE, probe.clone());
    }
    let name = check.get(fields::NAME).map(str::to_string);
    if let Some(name) = &name {
        check.keep(fields::NAME, name.clone());
    }

    let valid = check.errors.is_empty();
    let config = match device_type {
        Some(device_type) if valid => Some(DeviceConfig {
            id: DeviceId::new(),
            device_type,
            broker_id,
            address,
            channel,
            message_types,
            temperature: TemperatureSettings {
                conversion,
                offset: temperature_offset,
                decimals,
            },
            humidity_offset,
            probe_id,
            host_id,
            name,
            muted,
        }),
        _ => None,
    };

    ConfigValidation {
        valid,
        values: check.values,
        field_errors: check.errors,
        config,
    }
}
