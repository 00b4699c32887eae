//! Typed accessors over loosely-typed Vault payloads.
//!
//! Vault answers with JSON whose field types drift between versions and
//! engines (a TTL may be `"10m"` or `600`, a list may be an array or a
//! comma-separated string). Every accessor here returns the caller's default
//! when the key is absent or the value has an unusable type.

use serde_json::Value;
use tracing::warn;

use super::client::VaultData;

/// Read an integer. Integral floats are accepted; strings are not.
pub fn get_int(data: &VaultData, key: &str, default: i64) -> i64 {
    match data.get(key) {
        None | Some(Value::Null) => default,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => v,
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => f as i64,
                _ => {
                    warn!(key = %key, value = %n, "Failed to convert value to int");
                    default
                }
            },
        },
        Some(other) => {
            warn!(key = %key, kind = kind_of(other), "Don't know how to convert value to int");
            default
        }
    }
}

/// Read a string. Numbers are rendered in decimal.
pub fn get_string(data: &VaultData, key: &str, default: &str) -> String {
    match data.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            warn!(key = %key, kind = kind_of(other), "Don't know how to convert value to string");
            default.to_string()
        }
    }
}

/// Read a list of strings from an array or a comma-separated string.
pub fn get_string_array(data: &VaultData, key: &str, default: &[String]) -> Vec<String> {
    match data.get(key) {
        None | Some(Value::Null) => default.to_vec(),
        Some(Value::Array(items)) => {
            let strings: Option<Vec<String>> =
                items.iter().map(|item| item.as_str().map(str::to_string)).collect();
            strings.unwrap_or_else(|| {
                warn!(key = %key, "Array contains non-string items");
                default.to_vec()
            })
        }
        Some(Value::String(s)) => split_list(s),
        Some(other) => {
            warn!(key = %key, kind = kind_of(other), "Failed to convert value to string list");
            default.to_vec()
        }
    }
}

/// Read a boolean.
pub fn get_bool(data: &VaultData, key: &str, default: bool) -> bool {
    match data.get(key) {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!(key = %key, kind = kind_of(other), "Failed to convert value to bool");
            default
        }
    }
}

/// Read a nested object.
pub fn get_map(data: &VaultData, key: &str) -> Option<VaultData> {
    match data.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(other) => {
            warn!(key = %key, kind = kind_of(other), "Failed to convert value to map");
            None
        }
    }
}

/// Split a comma-separated list, trimming blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Parse a Vault/Go style duration into whole seconds.
///
/// Accepts bare integers (seconds), and sequences of `<number><unit>` with
/// units `s`, `m`, `h` and `d`, e.g. `"90"`, `"10m"`, `"1h30m"`, `"1.5h"`.
/// The empty string is zero.
pub fn parse_duration_secs(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }

    let mut total = 0f64;
    let mut rest = value;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let multiplier = match &rest[..unit_len] {
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86400.0,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += number * multiplier;
    }

    Some(total.round() as u64)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
