use serde_json::Value;

/// Follow object keys and array indices (`"0"`) from `root`.
pub fn walk_json_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cursor = root;
    for segment in path {
        cursor = match cursor {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cursor)
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn first_text_field<'a>(payload: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| payload.get(*field))
        .filter_map(Value::as_str)
        .find(|text| !text.trim().is_empty())
}

/// Formatted (`fmt`) representation of a nested Yahoo Finance value.
pub fn formatted_field(source: &Value, key: &str) -> Option<String> {
    source
        .get(key)?
        .get("fmt")?
        .as_str()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Keep short bodies verbatim for diagnostics; summarise long ones.
pub fn short_text(body: &str, limit: usize) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.chars().count() > limit {
        None
    } else {
        Some(trimmed.to_string())
    }
}
