//! Query string encoding
//!
//! Flattens a fetch parameter map into `(key, value)` pairs the way the
//! discovery server expects them:
//! - Strings verbatim, numbers and booleans in their JSON text form
//! - Arrays as repeated `key[]=value` pairs
//! - Objects as JSON text
//! - Nulls omitted
//! - The entries of a `filters` object become top-level parameters

use serde_json::{Map, Value};

/// Key whose object value is spread into top-level parameters
pub const FILTERS_KEY: &str = "filters";

/// Encode `params` as query pairs
///
/// Keys listed in `json_keys` are sent as a single JSON-encoded value
/// instead of the repeated array form (`sampleIds=[1,2]`).
#[must_use]
pub fn encode_query(params: &Map<String, Value>, json_keys: &[&str]) -> Vec<(String, String)> {
    let mut flat = Map::new();
    for (key, value) in params {
        if key != FILTERS_KEY {
            flat.insert(key.clone(), value.clone());
        }
    }
    // Filters are spread last and override top-level keys
    if let Some(Value::Object(filters)) = params.get(FILTERS_KEY) {
        for (key, value) in filters {
            flat.insert(key.clone(), value.clone());
        }
    }

    let mut pairs = Vec::with_capacity(flat.len());
    for (key, value) in &flat {
        if json_keys.contains(&key.as_str()) {
            if !value.is_null() {
                pairs.push((key.clone(), value.to_string()));
            }
            continue;
        }
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let array_key = format!("{key}[]");
                pairs.extend(
                    items
                        .iter()
                        .filter_map(scalar_text)
                        .map(|text| (array_key.clone(), text)),
                );
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test input must be an object"),
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn scalars_and_nulls() {
        let encoded = encode_query(
            &map(json!({
                "domain": "my_data",
                "limit": 50,
                "listAllIds": true,
                "search": null,
            })),
            &[],
        );
        assert_eq!(
            encoded,
            pairs(&[("domain", "my_data"), ("limit", "50"), ("listAllIds", "true")])
        );
    }

    #[test]
    fn arrays_repeat_and_objects_encode() {
        let encoded = encode_query(
            &map(json!({
                "host": ["human", "mosquito"],
                "time": {"start": "2020-01-01"},
            })),
            &[],
        );
        assert_eq!(
            encoded,
            pairs(&[
                ("host[]", "human"),
                ("host[]", "mosquito"),
                ("time", r#"{"start":"2020-01-01"}"#),
            ])
        );
    }

    #[test]
    fn json_keys_are_sent_whole() {
        let encoded = encode_query(
            &map(json!({"sampleIds": [1, 2], "other": null})),
            &["sampleIds", "other"],
        );
        assert_eq!(encoded, pairs(&[("sampleIds", "[1,2]")]));
    }

    #[test]
    fn filters_are_spread_and_win() {
        let encoded = encode_query(
            &map(json!({
                "domain": "public",
                "filters": {"taxon": [570], "domain": "my_data"},
            })),
            &[],
        );
        assert_eq!(encoded, pairs(&[("domain", "my_data"), ("taxon[]", "570")]));
    }
}
