//! Ordered-candidate lookups over loosely shaped backend records.
//!
//! The backend does not promise stable field names, so every logical field is
//! read through a list of aliases; the first alias holding a present value
//! wins. `null`, `false`, `0` and empty strings count as absent.

use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

/// First present value among `keys`, in order.
pub fn first_present<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| is_present(value))
}

/// First present value rendered as text (numbers are formatted, arrays and objects skipped).
pub fn first_text(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .filter(|value| is_present(value))
        .find_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
}

/// First present value that reads as a non-negative integer, from a number or numeric string.
pub fn first_u64(record: &Record, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .filter(|value| is_present(value))
        .find_map(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

pub fn first_f64(record: &Record, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .filter(|value| is_present(value))
        .find_map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
