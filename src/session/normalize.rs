//! Parameter normalization
//!
//! Cleans the raw slot bag of an intent-detection result before it is
//! merged into a session. Pure and idempotent.

use super::fields::{Parameters, Slot};
use serde_json::{json, Value};

/// Suffix the NLU agent appends to the verbatim-transcript copy of a slot
pub const RAW_TRANSCRIPT_SUFFIX: &str = ".original";

/// Normalize a raw parameter bag:
///
/// 1. drop raw-transcript shadow keys (`person.original`, ...)
/// 2. drop unfilled slots (`null` or `""`)
/// 3. reshape the person slot into a list of named entities
pub fn normalize(raw: &Parameters) -> Parameters {
    raw.iter()
        .filter(|(key, _)| !key.ends_with(RAW_TRANSCRIPT_SUFFIX))
        .filter(|(_, value)| !is_unfilled(value))
        .map(|(key, value)| {
            let value = if key == Slot::Person.key() {
                person_list(value)
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

fn is_unfilled(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// `"민지"` and `{"name": "민지"}` both become `[{"name": "민지"}]`.
/// Lists and other shapes pass through untouched.
fn person_list(value: &Value) -> Value {
    match value {
        Value::String(name) => json!([{ "name": name }]),
        Value::Object(obj) if obj.get("name").is_some_and(Value::is_string) => {
            Value::Array(vec![value.clone()])
        }
        _ => value.clone(),
    }
}
