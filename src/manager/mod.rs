// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device lifecycle coordination and message dispatch.
//!
//! The [`DeviceManager`] owns every registry of the routing layer:
//!
//! - the live device registry and each device's behavior chain
//! - the [`SubscriptionIndex`] mapping `(broker, topic)` to listeners
//! - add-ons waiting for their host
//! - the discovered-device ledger
//! - the event bus reporting lifecycle and state changes
//!
//! Messages are queued by the transport into an [`Inbox`](crate::protocol::Inbox)
//! and handled by [`DeviceManager::process_pending`], either called directly
//! or driven by [`run`]/[`spawn`].
//!
//! # Examples
//!
//! ## Starting devices and add-ons
//!
//! ```
//! use std::sync::Arc;
//!
//! use shellor_lib::manager::{DeviceConfig, DeviceManager, LifecycleState, ManagerConfig, StartOutcome};
//! use shellor_lib::protocol::{Inbox, MemoryTransport};
//!
//! # fn main() -> shellor_lib::Result<()> {
//! let mut manager = DeviceManager::new(ManagerConfig::default(), Arc::new(MemoryTransport::new()), Inbox::new());
//!
//! let host = DeviceConfig::new("shelly1").with_broker(1).with_address("shellies/shelly1-AABBCC");
//! let probe = DeviceConfig::addon("addon-temperature", host.id).with_channel(1);
//! let probe_id = probe.id;
//!
//! // The add-on waits until its host is started.
//! assert_eq!(manager.start_device(probe)?, StartOutcome::Pending);
//! manager.start_device(host)?;
//! assert_eq!(manager.lifecycle(probe_id), Some(LifecycleState::Started));
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the dispatch loop
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shellor_lib::event::DeviceEvent;
//! use shellor_lib::manager::{DeviceManager, ManagerConfig, spawn};
//! use shellor_lib::protocol::{Inbox, MemoryTransport};
//! use tokio::sync::Mutex;
//!
//! # async fn example() {
//! let manager = DeviceManager::new(ManagerConfig::default(), Arc::new(MemoryTransport::new()), Inbox::new());
//! let mut events = manager.subscribe();
//! let manager = Arc::new(Mutex::new(manager));
//! let handle = spawn(Arc::clone(&manager));
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let DeviceEvent::StateChanged { device_id, changes, .. } = event {
//!             println!("{device_id}: {changes:?}");
//!         }
//!     }
//! });
//!
//! // ... later
//! handle.shutdown().await;
//! # }
//! ```

mod device_config;
mod device_manager;
mod dispatch;
mod lifecycle;
mod managed_device;
mod runner;
mod subscription_index;

pub use device_config::{DeviceConfig, ManagerConfig, normalize_address};
pub use device_manager::DeviceManager;
pub use lifecycle::{AnnounceOutcome, StartOutcome};
pub use managed_device::LifecycleState;
pub use runner::{DispatchHandle, run, spawn};
pub use subscription_index::SubscriptionIndex;
