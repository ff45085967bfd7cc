//! Result projection.
//!
//! # Data Flow
//! ```text
//! handler result (object) + selector (array)
//!     → keep plain field names verbatim
//!     → recurse into [field, nested-selector] pairs
//!     → drop nested results that end up empty
//!     → projected object
//! ```
//!
//! # Design Decisions
//! - A non-array selector is a passthrough
//! - Missing fields and malformed selector entries are skipped, never errors
//! - Projection is idempotent

use serde_json::{Map, Value};

/// Prune `value` to the fields named by `selector`.
///
/// Selector entries are either a field name (`"name"`) or a pair
/// (`["field", nested]`). For a pair, an array field has every element
/// projected with `nested` and keeps only the non-empty projections; an
/// object field is projected directly. Fields that end up empty are omitted.
pub fn project(value: &Value, selector: &Value) -> Value {
    let Value::Array(fields) = selector else {
        return value.clone();
    };
    match value {
        Value::Object(object) => Value::Object(project_object(object, fields)),
        _ => Value::Object(Map::new()),
    }
}

fn project_object(object: &Map<String, Value>, fields: &[Value]) -> Map<String, Value> {
    let mut projected = Map::new();

    for field in fields {
        match field {
            Value::String(name) => {
                if let Some(value) = object.get(name) {
                    projected.insert(name.clone(), value.clone());
                }
            }
            Value::Array(pair) => {
                let (Some(Value::String(name)), Some(nested)) = (pair.first(), pair.get(1)) else {
                    continue;
                };
                match object.get(name) {
                    Some(Value::Array(items)) => {
                        let kept: Vec<Value> = items
                            .iter()
                            .map(|item| project(item, nested))
                            .filter(|item| !is_empty(item))
                            .collect();
                        if !kept.is_empty() {
                            projected.insert(name.clone(), Value::Array(kept));
                        }
                    }
                    Some(inner @ Value::Object(_)) => {
                        let inner = project(inner, nested);
                        if !is_empty(&inner) {
                            projected.insert(name.clone(), inner);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    projected
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Object(object) => object.is_empty(),
        Value::Null => true,
        _ => false,
    }
}
