// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events delivered to the host.
//!
//! The device manager reports lifecycle transitions, decoded state changes
//! and discovered devices on an [`EventBus`]. The host subscribes and
//! mirrors them into its own state store.
//!
//! # Examples
//!
//! ```
//! use shellor_lib::event::{DeviceEvent, DeviceId, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DeviceEvent::Removed { device_id: DeviceId::new() });
//! assert!(rx.try_recv().is_ok());
//! ```

mod device_event;
mod device_id;
mod event_bus;

pub use device_event::DeviceEvent;
pub use device_id::DeviceId;
pub use event_bus::{DEFAULT_EVENT_CAPACITY, EventBus};
