// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport over a pool of broker connections.
//!
//! The pool holds at most one [`MqttBroker`] per broker id. Every connection
//! feeds the same inbox, so the dispatch worker sees one ordered stream per
//! broker.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{BrokerId, InboxSender, MqttBroker, OutboundMessage, Transport};
use crate::error::ProtocolError;

/// [`Transport`] backed by live MQTT connections.
///
/// # Examples
///
/// ```no_run
/// use shellor_lib::protocol::{Inbox, MqttTransport};
///
/// # async fn example() -> shellor_lib::Result<()> {
/// let inbox = Inbox::new();
/// let transport = MqttTransport::new();
///
/// transport
///     .connect(1, "mqtt://192.168.1.50:1883", None, inbox.sender())
///     .await?;
/// assert_eq!(transport.broker_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttTransport {
    brokers: RwLock<HashMap<BrokerId, MqttBroker>>,
}

impl MqttTransport {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to a broker URL and registers it under `broker_id`.
    ///
    /// An existing connection for the same id is replaced.
    ///
    /// # Arguments
    ///
    /// * `broker_id` - Id stamped on inbound messages and used to route publishes
    /// * `broker_url` - The MQTT broker URL (e.g., `mqtt://192.168.1.50:1883`)
    /// * `credentials` - Optional (username, password) tuple for authentication
    /// * `inbox` - Queue receiving inbound messages
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid or connection fails.
    pub async fn connect(
        &self,
        broker_id: BrokerId,
        broker_url: &str,
        credentials: Option<(&str, &str)>,
        inbox: InboxSender,
    ) -> Result<MqttBroker, ProtocolError> {
        let (host, port) = parse_broker_url(broker_url)?;
        let mut builder = MqttBroker::builder().broker_id(broker_id).host(host).port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(username, password);
        }
        let broker = builder.build(inbox).await?;
        self.insert(broker.clone());
        Ok(broker)
    }

    /// Registers an already connected broker under its own id.
    pub fn insert(&self, broker: MqttBroker) {
        if let Some(previous) = self.brokers.write().insert(broker.id(), broker) {
            tracing::debug!(broker = previous.id(), "Replaced broker connection");
        }
    }

    /// Unregisters a broker, returning its connection.
    pub fn remove(&self, broker_id: BrokerId) -> Option<MqttBroker> {
        self.brokers.write().remove(&broker_id)
    }

    /// Returns the connection for a broker id.
    #[must_use]
    pub fn broker(&self, broker_id: BrokerId) -> Option<MqttBroker> {
        self.brokers.read().get(&broker_id).cloned()
    }

    /// Returns the number of registered brokers.
    #[must_use]
    pub fn broker_count(&self) -> usize {
        self.brokers.read().len()
    }

    fn with_broker<T>(
        &self,
        broker_id: BrokerId,
        f: impl FnOnce(&MqttBroker) -> Result<T, ProtocolError>,
    ) -> Result<T, ProtocolError> {
        let brokers = self.brokers.read();
        let broker = brokers
            .get(&broker_id)
            .ok_or(ProtocolError::UnknownBroker(broker_id))?;
        if !broker.is_connected() {
            return Err(ProtocolError::Unavailable(broker_id));
        }
        f(broker)
    }
}

impl Transport for MqttTransport {
    fn is_available(&self, broker_id: BrokerId) -> bool {
        self.brokers
            .read()
            .get(&broker_id)
            .is_some_and(MqttBroker::is_connected)
    }

    fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        self.with_broker(message.broker_id, |broker| broker.publish(message))
    }

    fn subscribe(&self, broker_id: BrokerId, topic: &str) -> Result<(), ProtocolError> {
        self.with_broker(broker_id, |broker| broker.subscribe(topic))
    }

    fn unsubscribe(&self, broker_id: BrokerId, topic: &str) -> Result<(), ProtocolError> {
        self.with_broker(broker_id, |broker| broker.unsubscribe(topic))
    }
}

/// Parses a broker URL into host and port.
///
/// Accepts `mqtt://` and `tcp://` prefixes; the port defaults to 1883.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidAddress` if the port is not a number or
/// the host is empty.
pub fn parse_broker_url(url: &str) -> Result<(String, u16), ProtocolError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| ProtocolError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    if host.is_empty() {
        return Err(ProtocolError::InvalidAddress("Missing host".to_string()));
    }

    Ok((host, port))
}
