//! Coercion of loosely typed custom-field JSON into display strings.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

type Decoder = fn(&Value) -> Option<String>;

/// Interpretations tried in order; the first non-empty result wins.
const DECODERS: [Decoder; 5] = [
    decode_string,
    decode_number,
    decode_option,
    decode_option_list,
    decode_string_list,
];

/// Convert a raw custom-field value into a display string.
///
/// Returns an empty string when no interpretation applies (including `null`).
pub fn extract_custom_field_value(value: &Value) -> String {
    DECODERS
        .iter()
        .find_map(|decode| decode(value).filter(|s| !s.is_empty()))
        .unwrap_or_default()
}

/// Resolve configured custom fields (friendly name -> field ID) against the
/// raw issue fields. Unresolvable fields are omitted; `None` when nothing is
/// configured or nothing resolved.
pub fn collect_custom_fields(
    mapping: &BTreeMap<String, String>,
    fields: &Map<String, Value>,
) -> Option<BTreeMap<String, String>> {
    if mapping.is_empty() {
        return None;
    }

    let mut resolved = BTreeMap::new();
    for (name, field_id) in mapping {
        let Some(raw) = fields.get(field_id) else {
            debug!(field = %name, field_id = %field_id, "Custom field not present in response");
            continue;
        };

        let value = extract_custom_field_value(raw);
        if value.is_empty() {
            debug!(field = %name, field_id = %field_id, "Custom field has no displayable value");
            continue;
        }
        resolved.insert(name.clone(), value);
    }

    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}

fn decode_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn decode_number(value: &Value) -> Option<String> {
    let Value::Number(number) = value else {
        return None;
    };

    if let Some(int) = number.as_i64() {
        return Some(int.to_string());
    }
    if let Some(uint) = number.as_u64() {
        return Some(uint.to_string());
    }
    // f64's Display drops the fractional part for integral values.
    number.as_f64().map(|float| float.to_string())
}

fn decode_option(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => option_label(value),
        _ => None,
    }
}

fn decode_option_list(value: &Value) -> Option<String> {
    let Value::Array(items) = value else {
        return None;
    };
    if !items.iter().all(Value::is_object) {
        return None;
    }

    let labels: Vec<String> = items.iter().filter_map(option_label).collect();
    Some(labels.join(", "))
}

fn decode_string_list(value: &Value) -> Option<String> {
    let Value::Array(items) = value else {
        return None;
    };

    let labels: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    labels.map(|labels| labels.join(", "))
}

/// `value` is preferred over `name` for select-list style objects.
fn option_label(value: &Value) -> Option<String> {
    let label = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    label("value").or_else(|| label("name")).map(str::to_string)
}
