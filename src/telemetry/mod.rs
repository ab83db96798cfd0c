// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload decoding for Shelly MQTT messages.
//!
//! Shelly devices publish one value per topic, mostly as bare strings:
//!
//! - `shellies/<id>/relay/0` - `on`, `off` or `overpower`
//! - `shellies/<id>/relay/0/power` - `12.5`
//! - `shellies/<id>/sensor/temperature` - `21.4`
//! - `shellies/<id>/light/0/status` - JSON light status
//! - `shellies/announce` - JSON announcement
//!
//! The [`decode`] helpers cover the bare strings; the JSON documents have
//! typed structs here.
//!
//! # Examples
//!
//! ```
//! use shellor_lib::telemetry::{Announcement, decode};
//!
//! assert_eq!(decode::parse_float("power", "12.5").unwrap(), 12.5);
//!
//! let announce = Announcement::parse(r#"{"id":"shelly1-AABBCC","ip":"10.0.0.5"}"#).unwrap();
//! assert_eq!(announce.id, "shelly1-AABBCC");
//! ```

mod announce;
pub mod decode;
mod light_status;
mod probes;
mod thermostat;

pub use announce::Announcement;
pub use light_status::LightStatus;
pub use probes::{ProbeReading, find_probe};
pub use thermostat::{ThermostatChannel, ThermostatReport, TrvBattery, TrvTarget, TrvTemperature};
