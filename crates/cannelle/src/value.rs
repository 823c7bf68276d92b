//! Render-data semantics over `serde_json::Value`.

use serde_json::Value;

/// Truthiness for `if` and the empty-check in `range`: null, false, zero,
/// and empty strings/arrays/objects are false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// How a printed value appears in output. Strings print raw; null prints
/// nothing; containers fall back to compact JSON.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Resolve a field path against the data. A missing step resolves to null
/// rather than erroring, so optional fields render as empty.
pub(crate) fn lookup(data: &Value, path: &[String]) -> Value {
    let mut current = data;
    for segment in path {
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        }
    }
    current.clone()
}
