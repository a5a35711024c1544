// JSON import (array of objects)

use std::path::Path;

use ledgerscan_analysis::{Dataset, Value};

use crate::build_dataset;

pub fn import(path: &Path) -> Result<Dataset, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    import_from_str(&content)
}

/// Column order is the key order of the first object; keys first seen in
/// later objects are appended.
pub fn import_from_str(content: &str) -> Result<Dataset, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {}", e))?;
    let items = parsed
        .as_array()
        .ok_or_else(|| "Expected a JSON array of objects".to_string())?;

    let mut headers: Vec<String> = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| format!("Element {} is not an object", idx))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let records = items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_value).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(build_dataset(headers, records))
}

fn json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Absent,
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or_default(),
        serde_json::Value::String(s) if s.is_empty() => Value::Absent,
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}
