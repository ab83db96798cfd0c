// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed decoding of plain string payloads.
//!
//! Devices publish numbers, booleans and flags as bare strings (`"21.5"`,
//! `"1"`, `"true"`, `"on"`). Every behavior decodes through these helpers
//! so malformed values surface as [`ParseError`]s with the field name.

use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::types::RelayReport;

/// Parses a finite floating point number.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` if the payload is not a finite number.
pub fn parse_float(field: &str, payload: &str) -> Result<f64, ParseError> {
    let trimmed = payload.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(ParseError::invalid(field, format!("non-finite number {trimmed:?}"))),
        Err(_) => Err(ParseError::invalid(field, format!("expected a number, got {trimmed:?}"))),
    }
}

/// Parses a whole number.
///
/// Accepts `"42"` as well as `"42.0"`; rejects fractional values.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` if the payload is not a whole number.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_integer(field: &str, payload: &str) -> Result<i64, ParseError> {
    let trimmed = payload.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    let value = parse_float(field, trimmed)?;
    if value.fract() != 0.0 || value.abs() > 9.0e15 {
        return Err(ParseError::invalid(field, format!("expected a whole number, got {trimmed:?}")));
    }
    Ok(value as i64)
}

/// Parses a boolean flag.
///
/// Accepts `1`/`0`, `true`/`false` and `on`/`off` in any case.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` for anything else.
pub fn parse_flag(field: &str, payload: &str) -> Result<bool, ParseError> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        other => Err(ParseError::invalid(field, format!("expected a flag, got {other:?}"))),
    }
}

/// Parses the payload of a relay status topic.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` for values other than
/// `on`, `off` and `overpower`.
pub fn parse_relay(field: &str, payload: &str) -> Result<RelayReport, ParseError> {
    payload
        .parse()
        .map_err(|_| ParseError::invalid(field, format!("unexpected relay state {payload:?}")))
}

/// Parses one of a fixed set of words, returning it normalized.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` if the payload is not listed.
pub fn parse_word<'a>(field: &str, payload: &str, allowed: &[&'a str]) -> Result<&'a str, ParseError> {
    let trimmed = payload.trim();
    allowed
        .iter()
        .find(|word| word.eq_ignore_ascii_case(trimmed))
        .copied()
        .ok_or_else(|| ParseError::invalid(field, format!("unexpected value {trimmed:?}")))
}

/// Parses a JSON payload into `T`.
///
/// # Errors
///
/// Returns `ParseError::Json` if the payload is not valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(payload: &str) -> Result<T, ParseError> {
    serde_json::from_str(payload).map_err(ParseError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_accepts_whitespace() {
        assert!((parse_float("t", " 21.5\n").unwrap() - 21.5).abs() < f64::EPSILON);
    }

    #[test]
    fn float_rejects_text_and_nan() {
        assert!(matches!(parse_float("t", "warm"), Err(ParseError::InvalidValue { .. })));
        assert!(parse_float("t", "NaN").is_err());
        assert!(parse_float("t", "inf").is_err());
    }

    #[test]
    fn integer_accepts_integral_floats() {
        assert_eq!(parse_integer("b", "42").unwrap(), 42);
        assert_eq!(parse_integer("b", "42.0").unwrap(), 42);
        assert!(parse_integer("b", "42.5").is_err());
    }

    #[test]
    fn flag_variants() {
        assert!(parse_flag("f", "1").unwrap());
        assert!(parse_flag("f", "TRUE").unwrap());
        assert!(!parse_flag("f", "off").unwrap());
        assert!(parse_flag("f", "maybe").is_err());
    }

    #[test]
    fn relay_values() {
        assert_eq!(parse_relay("relay", "overpower").unwrap(), RelayReport::Overpower);
        assert!(parse_relay("relay", "{}").is_err());
    }

    #[test]
    fn word_is_normalized() {
        assert_eq!(parse_word("s", "OPEN", &["open", "close"]).unwrap(), "open");
        assert!(parse_word("s", "ajar", &["open", "close"]).is_err());
    }

    #[test]
    fn json_errors_are_parse_errors() {
        let result: Result<serde_json::Value, _> = parse_json("{not json");
        assert!(matches!(result, Err(ParseError::Json(_))));
    }
}
