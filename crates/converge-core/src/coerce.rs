//! Lenient scalar decoding for hand-written manifests.
//!
//! Ports, port mappings and health check timings accept a number or a
//! numeric string. Environment values accept any scalar and are kept as
//! strings.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A required integer.
pub(crate) fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    to_u32(&Value::deserialize(deserializer)?).map_err(D::Error::custom)
}

/// An optional integer; `null` reads as unset.
pub(crate) fn opt_int<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u32>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => to_u32(&value).map(Some).map_err(D::Error::custom),
    }
}

/// An optional list of integers.
pub(crate) fn opt_ints<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<u32>>, D::Error> {
    let Some(values) = Option::<Vec<Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    values
        .iter()
        .map(to_u32)
        .collect::<Result<_, _>>()
        .map(Some)
        .map_err(D::Error::custom)
}

/// An optional map whose scalar values are rendered as strings.
pub(crate) fn opt_string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, String>>, D::Error> {
    let Some(map) = Option::<BTreeMap<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    map.into_iter()
        .map(|(key, value)| match scalar_string(value) {
            Some(value) => Ok((key, value)),
            None => Err(D::Error::custom(format!("{key}: expected a string, number or bool"))),
        })
        .collect::<Result<_, _>>()
        .map(Some)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(value: &Value) -> Result<u32, String> {
    let wide = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    wide.and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("expected a non-negative integer, got {value}"))
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
