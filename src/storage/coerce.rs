//! Raw field → typed value conversion used by scans
//!
//! Best effort: a field that does not parse as its declared type is
//! returned as text instead of failing the scan.

use crate::types::{ColumnKind, Value};

/// Case-insensitive spellings read as boolean true
pub const TRUTHY: [&str; 5] = ["true", "1", "yes", "y", "t"];

pub fn coerce_field(raw: &str, kind: Option<&ColumnKind>) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }

    match kind {
        Some(ColumnKind::Integer) | Some(ColumnKind::Bigint) => match raw.trim().parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => passthrough(raw, "integer"),
        },
        Some(ColumnKind::Float) | Some(ColumnKind::Double) => match raw.trim().parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => passthrough(raw, "float"),
        },
        Some(ColumnKind::Boolean) => {
            let lowered = raw.trim().to_lowercase();
            Value::Bool(TRUTHY.contains(&lowered.as_str()))
        }
        // VARCHAR, CHAR, DATE, TIMESTAMP and unknown types stay textual
        _ => Value::Text(raw.to_string()),
    }
}

fn passthrough(raw: &str, expected: &str) -> Value {
    log::warn!("Value '{}' is not a valid {}, keeping it as text", raw, expected);
    Value::Text(raw.to_string())
}
