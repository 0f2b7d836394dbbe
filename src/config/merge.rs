//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: replaced, last wins
//! - Scalars: last wins

use serde_json::Value;

/// Deep merge `overlay` onto `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order; the last one has highest precedence.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_merge_keeps_sibling_keys() {
        let base = json!({"logging": {"filter": "info", "json": false}});
        let overlay = json!({"logging": {"json": true}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["logging"]["filter"], "info");
        assert_eq!(result["logging"]["json"], true);
    }

    #[test]
    fn test_array_replaced() {
        let base = json!({"list": [1, 2, 3]});
        let overlay = json!({"list": [9]});
        assert_eq!(deep_merge(base, overlay)["list"], json!([9]));
    }

    #[test]
    fn test_layer_precedence() {
        let builtin = json!({"hashing": {"algorithm": "sha256", "normalize_line_endings": false}});
        let user = json!({"hashing": {"algorithm": "sha512"}});
        let project = json!({"hashing": {"normalize_line_endings": true}});
        let cli = json!({"hashing": {"algorithm": "sha384"}});

        let result = merge_layers(vec![builtin, user, project, cli]);
        assert_eq!(result["hashing"]["algorithm"], "sha384");
        assert_eq!(result["hashing"]["normalize_line_endings"], true);
    }

    #[test]
    fn test_empty_layers_is_null() {
        assert!(merge_layers(Vec::new()).is_null());
    }
}
