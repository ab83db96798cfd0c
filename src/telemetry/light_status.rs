// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for light status documents.

use serde::Deserialize;

/// JSON status published on `<prefix>/<channel>/status` by lights.
///
/// Bulbs and RGBW controllers report `mode` and the color fields; dimmers
/// only report `ison` and `brightness`.
///
/// # Examples
///
/// ```
/// use shellor_lib::telemetry::LightStatus;
///
/// let json = r#"{"ison":true,"mode":"color","red":255,"green":0,"blue":80,"gain":60}"#;
/// let status: LightStatus = serde_json::from_str(json).unwrap();
/// assert_eq!(status.mode.as_deref(), Some("color"));
/// assert_eq!(status.gain, Some(60));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LightStatus {
    /// Output is on.
    #[serde(default)]
    pub ison: Option<bool>,
    /// Reported mode (`color` or `white`).
    #[serde(default)]
    pub mode: Option<String>,
    /// White brightness (0-100).
    #[serde(default)]
    pub brightness: Option<i64>,
    /// Color gain (0-100).
    #[serde(default)]
    pub gain: Option<i64>,
    /// Red level (0-255).
    #[serde(default)]
    pub red: Option<i64>,
    /// Green level (0-255).
    #[serde(default)]
    pub green: Option<i64>,
    /// Blue level (0-255).
    #[serde(default)]
    pub blue: Option<i64>,
    /// White level (0-255).
    #[serde(default)]
    pub white: Option<i64>,
    /// Color temperature in Kelvin.
    #[serde(default)]
    pub temp: Option<i64>,
    /// Effect index.
    #[serde(default)]
    pub effect: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimmer_status_has_no_mode() {
        let status: LightStatus = serde_json::from_str(r#"{"ison":false,"brightness":35}"#).unwrap();
        assert_eq!(status.ison, Some(false));
        assert_eq!(status.brightness, Some(35));
        assert!(status.mode.is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let status: LightStatus =
            serde_json::from_str(r#"{"ison":true,"has_timer":false,"transition":0,"temp":4000}"#)
                .unwrap();
        assert_eq!(status.temp, Some(4000));
    }
}
