//! Shallow, null-safe merging of JSON objects.
//!
//! This is the primitive every state transition is built from: a new
//! object is produced from the left-to-right merge of its parts, and the
//! parts themselves are never touched.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by [`update`].
///
/// These are programmer errors (a non-object handed to the merge), not
/// runtime data errors, so callers are expected to propagate them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Cannot merge part {index}: expected an object, got {kind}")]
    NotAnObject { index: usize, kind: &'static str },
}

/// Returns true for the values a missing part is equivalent to:
/// `null`, `false`, `0` and the empty string.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Short type name used in error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Merge `parts` left to right into a fresh object.
///
/// Missing (`None`) and falsy parts count as `{}`. Later keys override
/// earlier ones; nested objects are replaced, not merged.
///
/// # Errors
/// Returns [`MergeError::NotAnObject`] for a truthy part that is not an
/// object.
pub fn update<'a, I>(parts: I) -> Result<Map<String, Value>, MergeError>
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let mut merged = Map::new();
    for (index, part) in parts.into_iter().enumerate() {
        match part {
            None => {}
            Some(value) if is_falsy(value) => {}
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(other) => {
                return Err(MergeError::NotAnObject {
                    index,
                    kind: kind_of(other),
                })
            }
        }
    }
    Ok(merged)
}
