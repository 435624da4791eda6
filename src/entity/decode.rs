//! Typed field extraction from store property maps
//!
//! A missing or mistyped field is a `DataFormat` error, never a default.

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::storage::Properties;

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Required text field.
pub(crate) fn text_field(properties: &Properties, field: &str) -> EngineResult<String> {
    match properties.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(EngineError::data_format(
            field,
            format!("expected string, found {}", describe(other)),
        )),
        None => Err(EngineError::data_format(field, "missing")),
    }
}

/// Optional text field: absent or null is `None`, anything else but a
/// string is an error.
pub(crate) fn optional_text_field(properties: &Properties, field: &str) -> EngineResult<Option<String>> {
    match properties.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(EngineError::data_format(
            field,
            format!("expected string, found {}", describe(other)),
        )),
    }
}

/// Required integer field. Stores that only speak JSON numbers may return
/// integers as floats; those are accepted when they have no fractional part.
pub(crate) fn int_field(properties: &Properties, field: &str) -> EngineResult<i64> {
    match properties.get(field) {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(EngineError::data_format(field, format!("{} is not an integer", n))),
            }
        }
        Some(other) => Err(EngineError::data_format(
            field,
            format!("expected integer, found {}", describe(other)),
        )),
        None => Err(EngineError::data_format(field, "missing")),
    }
}
