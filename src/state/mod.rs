// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management.
//!
//! - [`DeviceState`] - The normalized key/value state of one device
//! - [`StateKey`] / [`StateValue`] - Field names and typed values
//! - [`StateChange`] - A single field update, as published to the host

mod device_state;
mod state_change;

pub use device_state::DeviceState;
pub use state_change::{StateChange, StateKey, StateValue};
