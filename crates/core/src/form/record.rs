use std::collections::BTreeMap;

use serde_json::Value;

/// One conversation's accumulated answers, keyed by field name.
pub type DataRecord = BTreeMap<String, String>;

/// Builds a record from an untrusted JSON value.
///
/// Anything other than an object yields an empty record. `null` becomes the
/// empty string so the key still reads as "unknown".
pub fn record_from_json(value: &Value) -> DataRecord {
    let Value::Object(map) = value else {
        return DataRecord::new();
    };

    map.iter().map(|(key, value)| (key.clone(), value_to_text(value).unwrap_or_default())).collect()
}

/// Builds an extraction from an untrusted JSON value.
///
/// Unlike [`record_from_json`], `null` entries are dropped: a model that
/// reports `"field": null` has not observed a value and must not erase one.
pub fn extraction_from_json(value: &Value) -> DataRecord {
    let Value::Object(map) = value else {
        return DataRecord::new();
    };

    map.iter()
        .filter_map(|(key, value)| value_to_text(value).map(|text| (key.clone(), text)))
        .collect()
}

pub fn record_to_json(record: &DataRecord) -> Value {
    Value::Object(
        record.iter().map(|(key, value)| (key.clone(), Value::String(value.clone()))).collect(),
    )
}

pub fn is_blank(value: Option<&String>) -> bool {
    value.map(|value| value.trim().is_empty()).unwrap_or(true)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}
