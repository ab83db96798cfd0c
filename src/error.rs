// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `ShelloR` library.
//!
//! This module provides the error hierarchy used across the library: value
//! validation, payload decoding, transport communication, device operations
//! and configuration records.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::protocol::BrokerId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while decoding a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred during device operations.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A configuration record was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device was not found in the manager.
    #[error("device not found")]
    DeviceNotFound,

    /// No device model is registered for the requested type tag.
    #[error("unknown device type: {0}")]
    UnknownDeviceType(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// An unknown temperature conversion tag was provided.
    #[error("invalid temperature conversion: {0}")]
    InvalidTemperatureConversion(String),
}

/// Errors related to the broker transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// No connection is registered for the broker.
    #[error("unknown broker {0}")]
    UnknownBroker(BrokerId),

    /// The broker connection exists but is not usable right now.
    #[error("broker {0} is unavailable")]
    Unavailable(BrokerId),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to decoding device payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the payload.
    #[error("missing field in payload: {0}")]
    MissingField(String),

    /// Unexpected payload format.
    #[error("unexpected payload format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

impl ParseError {
    /// Shorthand for [`ParseError::InvalidValue`].
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors related to device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device model has no encoding for the requested action.
    #[error("device does not support {action}")]
    UnsupportedAction {
        /// Name of the rejected action.
        action: String,
    },

    /// The action is supported but its argument was refused.
    #[error("invalid argument for {action}")]
    InvalidArgument {
        /// Name of the rejected action.
        action: String,
    },

    /// The device is not started.
    #[error("device is not started")]
    NotStarted,

    /// The addon's host device is not available.
    #[error("host device {host} is not available")]
    HostUnavailable {
        /// The host identifier the addon refers to.
        host: String,
    },

    /// Device configuration is invalid.
    #[error("invalid device configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors produced while turning raw configuration values into a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more fields failed validation.
    #[error("invalid fields: {}", format_fields(.0))]
    InvalidFields(BTreeMap<String, String>),
}

fn format_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field} ({message})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
