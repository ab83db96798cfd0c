// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ShelloR` Lib - MQTT routing and device state for Shelly devices.
//!
//! This library sits between broker connections and a host state store. It
//! takes raw MQTT messages, routes them to the typed device models listening
//! on their topics, decodes payloads into device state, and encodes user
//! actions back into command publishes.
//!
//! # Supported Features
//!
//! - **Routing**: `(broker, topic)` subscription index with per-device
//!   message-type filtering
//! - **Device models**: relays, rollers, energy meters, dimmers and color
//!   lights, buttons, battery sensors, TRV thermostats and sensor add-ons
//! - **Energy**: watt-minute counters with user reset and restart handling
//! - **Temperature**: per-device unit conversion, offset and rounding
//! - **Lifecycle**: add-ons waiting for their host, stop cascades, restart
//!   with retained state
//! - **Discovery**: ledger of announced devices nobody manages yet
//!
//! # Quick Start
//!
//! ## Routing a message
//!
//! ```
//! use std::sync::Arc;
//!
//! use shellor_lib::manager::{DeviceConfig, DeviceManager, ManagerConfig};
//! use shellor_lib::protocol::{InboundMessage, Inbox, MemoryTransport};
//! use shellor_lib::state::StateKey;
//!
//! # fn main() -> shellor_lib::Result<()> {
//! let inbox = Inbox::new();
//! let sender = inbox.sender();
//! let mut manager = DeviceManager::new(ManagerConfig::default(), Arc::new(MemoryTransport::new()), inbox);
//!
//! let plug = DeviceConfig::new("shellyplug-s")
//!     .with_broker(1)
//!     .with_address("shellies/shellyplug-s-AABBCC");
//! let plug_id = plug.id;
//! manager.start_device(plug)?;
//!
//! sender.offer(InboundMessage::new(1, "mqtt", "shellies/shellyplug-s-AABBCC/relay/0", "on"));
//! sender.offer(InboundMessage::new(1, "mqtt", "shellies/shellyplug-s-AABBCC/relay/0/power", "42.1"));
//! manager.process_pending();
//!
//! let state = manager.state(plug_id).unwrap();
//! assert_eq!(state.bool(StateKey::On), Some(true));
//! assert_eq!(state.float(StateKey::Power), Some(42.1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Sending an action
//!
//! ```
//! use std::sync::Arc;
//!
//! use shellor_lib::command::Action;
//! use shellor_lib::manager::{DeviceConfig, DeviceManager, ManagerConfig};
//! use shellor_lib::protocol::{Inbox, MemoryTransport};
//!
//! # fn main() -> shellor_lib::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let mut manager = DeviceManager::new(ManagerConfig::default(), transport.clone(), Inbox::new());
//!
//! let dimmer = DeviceConfig::new("shellydimmer").with_broker(1).with_address("shellies/dimmer");
//! let dimmer_id = dimmer.id;
//! manager.start_device(dimmer)?;
//! transport.take_published();
//!
//! manager.send_action(dimmer_id, &Action::SetBrightness { level: 140 })?;
//! let sent = transport.take_published();
//! assert_eq!(sent[0].topic, "shellies/dimmer/light/0/set");
//! assert!(sent[0].payload.contains("\"brightness\":100"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Connecting to a broker
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shellor_lib::manager::{DeviceManager, ManagerConfig, spawn};
//! use shellor_lib::protocol::{Inbox, MqttBroker, MqttTransport};
//! use tokio::sync::Mutex;
//!
//! #[tokio::main]
//! async fn main() -> shellor_lib::Result<()> {
//!     let inbox = Inbox::new();
//!     let broker = MqttBroker::builder()
//!         .broker_id(1)
//!         .host("192.168.1.10")
//!         .port(1883)
//!         .build(inbox.sender())
//!         .await?;
//!
//!     let transport = Arc::new(MqttTransport::new());
//!     transport.insert(broker);
//!
//!     let manager = DeviceManager::new(ManagerConfig::default(), transport, inbox);
//!     let handle = spawn(Arc::new(Mutex::new(manager)));
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod discovery;
pub mod error;
pub mod event;
pub mod manager;
pub mod model;
pub mod protocol;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod units;

pub use command::{Action, Command};
pub use error::{ConfigError, DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{DeviceEvent, DeviceId};
pub use manager::{DeviceConfig, DeviceManager, LifecycleState, ManagerConfig, StartOutcome};
pub use state::{DeviceState, StateKey};
pub use types::{PowerState, TemperatureConversion, TemperatureSettings};
