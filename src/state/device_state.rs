// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{StateChange, StateKey, StateValue};

/// Normalized state of one device instance.
///
/// Fields are absent until the device reports them. Writes go through
/// [`set`](Self::set), which reports whether anything changed.
///
/// # Examples
///
/// ```
/// use shellor_lib::state::{DeviceState, StateKey};
///
/// let mut state = DeviceState::new();
/// state.set(StateKey::Temperature, 21.5);
/// assert_eq!(state.float(StateKey::Temperature), Some(21.5));
/// assert_eq!(state.bool(StateKey::On), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState {
    values: BTreeMap<StateKey, StateValue>,
}

impl DeviceState {
    /// Creates a new empty device state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a field.
    ///
    /// Returns the change record, or `None` if the field already held
    /// this value.
    pub fn set(&mut self, key: StateKey, value: impl Into<StateValue>) -> Option<StateChange> {
        let value = value.into();
        if self.values.get(&key) == Some(&value) {
            return None;
        }
        let previous = self.values.insert(key, value.clone());
        Some(StateChange {
            key,
            previous,
            value,
        })
    }

    /// Removes a field, returning its last value.
    pub fn clear(&mut self, key: StateKey) -> Option<StateValue> {
        self.values.remove(&key)
    }

    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, key: StateKey) -> Option<&StateValue> {
        self.values.get(&key)
    }

    /// Returns a boolean field.
    #[must_use]
    pub fn bool(&self, key: StateKey) -> Option<bool> {
        self.get(key).and_then(StateValue::as_bool)
    }

    /// Returns a numeric field as a float.
    #[must_use]
    pub fn float(&self, key: StateKey) -> Option<f64> {
        self.get(key).and_then(StateValue::as_f64)
    }

    /// Returns an integer field.
    #[must_use]
    pub fn integer(&self, key: StateKey) -> Option<i64> {
        self.get(key).and_then(StateValue::as_i64)
    }

    /// Returns a text field.
    #[must_use]
    pub fn text(&self, key: StateKey) -> Option<&str> {
        self.get(key).and_then(StateValue::as_str)
    }

    /// Returns `true` if the output is known to be on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.bool(StateKey::On).unwrap_or(false)
    }

    /// Iterates over all known fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (StateKey, &StateValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the number of known fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no field is known yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
