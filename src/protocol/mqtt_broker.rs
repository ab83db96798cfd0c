// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection feeding the pending message queue.
//!
//! A broker connection subscribes once to a wildcard root (for example
//! `shellies/#`) and pushes every UTF-8 publish it receives into an
//! [`InboxSender`], stamped with its broker id and message-type tag.
//! Per-device routing happens later in the dispatch worker.
//!
//! # Examples
//!
//! ```no_run
//! use shellor_lib::protocol::{Inbox, MqttBroker};
//!
//! # async fn example() -> shellor_lib::Result<()> {
//! let inbox = Inbox::new();
//! let broker = MqttBroker::builder()
//!     .broker_id(1)
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build(inbox.sender())
//!     .await?;
//!
//! if broker.is_connected() {
//!     println!("Connected to MQTT broker");
//! }
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::oneshot;

use super::{BrokerId, InboundMessage, InboxSender, MQTT_MESSAGE_TYPE, OutboundMessage};
use crate::error::ProtocolError;

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Default wildcard subscription covering all Shelly topics.
pub const DEFAULT_SUBSCRIPTION_ROOT: &str = "shellies/#";

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    broker_id: BrokerId,
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    subscription_root: String,
    message_type: String,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            broker_id: 0,
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            subscription_root: DEFAULT_SUBSCRIPTION_ROOT.to_string(),
            message_type: MQTT_MESSAGE_TYPE.to_string(),
        }
    }
}

/// A live MQTT broker connection.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`).
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    client: AsyncClient,
    config: MqttBrokerConfig,
    connected: AtomicBool,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns the broker id stamped on inbound messages.
    #[must_use]
    pub fn id(&self) -> BrokerId {
        self.inner.config.broker_id
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns the wildcard subscription root.
    #[must_use]
    pub fn subscription_root(&self) -> &str {
        &self.inner.config.subscription_root
    }

    /// Queues a QoS 0 publish without waiting for the event loop.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Mqtt` if the request queue is full or closed.
    pub fn publish(&self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        self.inner.client.try_publish(
            message.topic.as_str(),
            QoS::AtMostOnce,
            message.retain,
            message.payload.clone().into_bytes(),
        )?;
        Ok(())
    }

    /// Queues a QoS 0 subscription.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Mqtt` if the request queue is full or closed.
    pub fn subscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        self.inner.client.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    /// Queues an unsubscription.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Mqtt` if the request queue is full or closed.
    pub fn unsubscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        self.inner.client.try_unsubscribe(topic)?;
        Ok(())
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect operation fails.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            broker = self.inner.config.broker_id,
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.client.disconnect().await?;
        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("broker_id", &self.inner.config.broker_id)
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use shellor_lib::protocol::{Inbox, MqttBroker};
/// use std::time::Duration;
///
/// # async fn example() -> shellor_lib::Result<()> {
/// let inbox = Inbox::new();
/// let broker = MqttBroker::builder()
///     .broker_id(2)
///     .host("192.168.1.50")
///     .subscription_root("shellies/#")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build(inbox.sender())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker id stamped on inbound messages (default: 0).
    #[must_use]
    pub fn broker_id(mut self, broker_id: BrokerId) -> Self {
        self.config.broker_id = broker_id;
        self
    }

    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the wildcard subscription (default: `shellies/#`).
    #[must_use]
    pub fn subscription_root(mut self, root: impl Into<String>) -> Self {
        self.config.subscription_root = root.into();
        self
    }

    /// Sets the message-type tag of inbound messages (default: `mqtt`).
    #[must_use]
    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.config.message_type = message_type.into();
        self
    }

    /// Connects to the broker and starts feeding `inbox`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self, inbox: InboxSender) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("shellor_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 64);

        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client,
                config: self.config.clone(),
                connected: AtomicBool::new(false),
            }),
        };

        let broker_clone = broker.clone();
        let (connack_tx, connack_rx) = oneshot::channel();

        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, inbox, Some(connack_tx)).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    broker = self.config.broker_id,
                    host = %self.config.host,
                    port = %self.config.port,
                    "Connected to MQTT broker"
                );
            }
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        broker
            .inner
            .client
            .subscribe(self.config.subscription_root.as_str(), QoS::AtMostOnce)
            .await?;
        tracing::debug!(root = %self.config.subscription_root, "Subscribed to wildcard root");

        Ok(broker)
    }
}

/// Pumps broker events into the inbox until the connection ends.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    inbox: InboxSender,
    connack_tx: Option<oneshot::Sender<()>>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = connack_tx;
    let broker_id = broker.inner.config.broker_id;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, broker = broker_id, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Ok(payload) = String::from_utf8(publish.payload.to_vec()) else {
                    tracing::trace!(topic = %publish.topic, "Skipping non UTF-8 payload");
                    continue;
                };
                tracing::trace!(topic = %publish.topic, payload = %payload, "MQTT message received");
                let message = InboundMessage::new(
                    broker_id,
                    broker.inner.config.message_type.as_str(),
                    &publish.topic,
                    payload,
                );
                inbox.offer(message);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!(broker = broker_id, "MQTT broker disconnected");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(broker = broker_id, error = %e, "MQTT broker event loop error");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
        }
    }
}
