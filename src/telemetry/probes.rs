// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lookup in multi-probe hub documents.
//!
//! Add-on hubs publish all probes at once, keyed by bus index:
//!
//! ```text
//! shellies/<id>/ext_temperatures  {"0":{"hwID":"28aa01","tC":21.5,"tF":70.7}, "1":{...}}
//! shellies/<id>/ext_humidities    {"0":{"hwID":"dht01","hum":48.2}}
//! ```

use serde_json::{Map, Value};

use crate::error::ParseError;

/// A probe value extracted from a hub document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReading {
    /// Bus index key under which the probe was listed.
    pub index: String,
    /// The requested field value.
    pub value: f64,
}

/// Finds a probe by hardware id and returns one of its numeric fields.
///
/// Returns `Ok(None)` when no entry carries `probe_id`.
///
/// # Errors
///
/// Returns `ParseError::Json` if the payload is not a JSON object, and
/// `ParseError::InvalidValue` if the probe is listed without a numeric
/// `field`.
///
/// # Examples
///
/// ```
/// use shellor_lib::telemetry::find_probe;
///
/// let doc = r#"{"0":{"hwID":"28aa01","tC":21.5},"1":{"hwID":"28bb02","tC":18.0}}"#;
/// let reading = find_probe(doc, "28bb02", "tC").unwrap().unwrap();
/// assert_eq!(reading.index, "1");
/// assert_eq!(reading.value, 18.0);
/// ```
pub fn find_probe(payload: &str, probe_id: &str, field: &str) -> Result<Option<ProbeReading>, ParseError> {
    let probes: Map<String, Value> = serde_json::from_str(payload)?;
    for (index, probe) in &probes {
        let matches = probe
            .get("hwID")
            .and_then(Value::as_str)
            .is_some_and(|id| id.eq_ignore_ascii_case(probe_id));
        if !matches {
            continue;
        }
        let value = probe
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| ParseError::invalid(field, format!("probe {probe_id} has no numeric {field}")))?;
        return Ok(Some(ProbeReading {
            index: index.clone(),
            value,
        }));
    }
    Ok(None)
}
