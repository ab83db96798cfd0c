// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker transport boundary.
//!
//! The device layer never talks to a broker directly. Inbound messages arrive
//! through an [`Inbox`], and outbound publishes go through a [`Transport`].
//!
//! # Transports
//!
//! - [`MemoryTransport`]: records publishes in memory, for dry runs and tests
//! - [`MqttTransport`]: a pool of [`MqttBroker`] connections (feature `mqtt`)
//!
//! # Message flow
//!
//! ```text
//! broker ──> InboxSender::offer ──> Inbox ──> DeviceManager::process_pending
//!                                                   │
//! broker <────────────── Transport::publish <───────┘
//! ```

#[cfg(feature = "mqtt")]
mod broker_pool;
mod inbox;
mod memory;
#[cfg(feature = "mqtt")]
mod mqtt_broker;

#[cfg(feature = "mqtt")]
pub use broker_pool::{MqttTransport, parse_broker_url};
pub use inbox::{Inbox, InboxSender, MessageTypeRegistry};
pub use memory::MemoryTransport;
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Identifier of a broker connection, as assigned by the host.
pub type BrokerId = u32;

/// Message-type tag used for MQTT-originated messages.
pub const MQTT_MESSAGE_TYPE: &str = "mqtt";

/// A raw message received from a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Broker the message arrived on.
    pub broker_id: BrokerId,
    /// Coarse classification tag used for filtering.
    pub message_type: String,
    /// Topic split on `/`.
    pub topic_parts: Vec<String>,
    /// UTF-8 payload.
    pub payload: String,
}

impl InboundMessage {
    /// Creates a message from a full topic string.
    #[must_use]
    pub fn new(
        broker_id: BrokerId,
        message_type: impl Into<String>,
        topic: &str,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            broker_id,
            message_type: message_type.into(),
            topic_parts: topic.split('/').map(str::to_string).collect(),
            payload: payload.into(),
        }
    }

    /// Reassembles the topic from its parts.
    #[must_use]
    pub fn topic(&self) -> String {
        self.topic_parts.join("/")
    }
}

/// A publish request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target broker.
    pub broker_id: BrokerId,
    /// Full topic.
    pub topic: String,
    /// Payload text.
    pub payload: String,
    /// Quality of service, always 0 for device commands.
    pub qos: u8,
    /// Retain flag, never set for device commands.
    pub retain: bool,
}

impl OutboundMessage {
    /// Creates a QoS 0, non-retained publish.
    #[must_use]
    pub fn new(broker_id: BrokerId, topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            broker_id,
            topic: topic.into(),
            payload: payload.into(),
            qos: 0,
            retain: false,
        }
    }
}

/// Outbound side of a broker connection.
///
/// All calls are fire-and-forget: implementations queue the request and
/// return without waiting for acknowledgement.
pub trait Transport: Send + Sync {
    /// Returns whether the broker can currently accept traffic.
    fn is_available(&self, broker_id: BrokerId) -> bool;

    /// Queues a publish.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the broker is unknown or the request
    /// cannot be queued.
    fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError>;

    /// Queues a QoS 0 subscription.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the broker is unknown or the request
    /// cannot be queued.
    fn subscribe(&self, broker_id: BrokerId, topic: &str) -> Result<(), ProtocolError>;

    /// Queues an unsubscription.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the broker is unknown or the request
    /// cannot be queued.
    fn unsubscribe(&self, broker_id: BrokerId, topic: &str) -> Result<(), ProtocolError>;
}
