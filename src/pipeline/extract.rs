use crate::utils::data_path::lookup_path;
use serde_json::Value;

/// Candidate paths for the array payload of a courier response, in
/// priority order. Responses that match none of these fall back to a
/// positional scan and then to a key summary.
pub const ARRAY_FIELD_RULES: &[&str] = &[
    "data",
    "items",
    "results",
    "records",
    "shipments",
    "trackings",
    "packages",
    "orders",
    "rows",
    "data.items",
    "result.data",
    "response.items",
];

pub fn first_array_field(body: &Value) -> Option<(String, Vec<Value>)> {
    for rule in ARRAY_FIELD_RULES {
        if let Some(Value::Array(items)) = lookup_path(body, rule) {
            return Some((rule.to_string(), items.clone()));
        }
    }
    if let Some(map) = body.as_object() {
        for (key, value) in map {
            if let Value::Array(items) = value {
                return Some((key.clone(), items.clone()));
            }
        }
    }
    None
}

/// Compact view of an oversized body: the first array field capped at
/// `limit` items, or a key summary when no array exists.
pub fn truncated_sample(body: &Value, limit: usize) -> Value {
    if let Value::Array(items) = body {
        return Value::Array(items.iter().take(limit).cloned().collect());
    }
    if let Some((field, items)) = first_array_field(body) {
        return serde_json::json!({
            "field": field,
            "items": items.into_iter().take(limit).collect::<Vec<_>>(),
        });
    }
    key_summary(body)
}

pub fn key_summary(body: &Value) -> Value {
    match body {
        Value::Object(map) => {
            let mut summary = serde_json::Map::new();
            for (key, value) in map {
                summary.insert(key.clone(), Value::String(type_name(value).to_string()));
            }
            Value::Object(summary)
        }
        other => Value::String(type_name(other).to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
