//! Canonical JSON serialization: sorted keys, no insignificant whitespace,
//! UTF-8. Used wherever a value is hashed rather than merely stored, so the
//! hash is stable across serializer/field-order changes - the audit chain
//! (`voting-audit`) and the receipt hash (`voting-ballots`) both rely on it.

use serde_json::Value;

/// Renders `value` with object keys sorted lexicographically and no
/// whitespace, recursively.
pub fn canonical_json_string(value: &Value) -> String {
    let sorted = sort_value(value);
    // `serde_json::to_string` never inserts whitespace.
    serde_json::to_string(&sorted).unwrap_or_default()
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), sort_value(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_regardless_of_input_order() {
        let a = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        let b = json!({"a": 2, "c": {"y": 2, "z": 1}, "b": 1});
        assert_eq!(canonical_json_string(&a), canonical_json_string(&b));
    }

    #[test]
    fn has_no_insignificant_whitespace() {
        let v = json!({"a": 1});
        assert_eq!(canonical_json_string(&v), r#"{"a":1}"#);
    }
}
