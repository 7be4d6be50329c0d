//! Structural merge and prune over parsed documents

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A parsed configuration document. Keys keep insertion order.
pub type ConfigObject = Map<String, Value>;

/// A value inside a [`ConfigObject`]
pub type ConfigValue = Value;

/// Result of pruning a document
#[derive(Debug, Clone, PartialEq)]
pub struct Pruned {
    /// Whether any key was removed
    pub changed: bool,
    /// The pruned document
    pub result: ConfigObject,
}

/// Recursive right-biased merge.
///
/// Objects present on both sides are merged key by key; any other value in
/// `patch` (arrays included) replaces the value in `base`. Existing keys keep
/// their position, new keys are appended.
#[must_use]
pub fn deep_merge(base: &ConfigObject, patch: &ConfigObject) -> ConfigObject {
    let mut merged = base.clone();
    for (key, patch_value) in patch {
        match (merged.get_mut(key), patch_value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                *existing = deep_merge(existing, nested);
            }
            _ => {
                merged.insert(key.clone(), patch_value.clone());
            }
        }
    }
    merged
}

/// Remove the keys marked by `shape`.
///
/// An empty object in `shape` deletes the key. A non-empty object recurses
/// when the document also holds an object there, and a child emptied by the
/// recursion is removed from its parent. Any other pairing deletes the key.
#[must_use]
pub fn prune(obj: &ConfigObject, shape: &ConfigObject) -> Pruned {
    let mut result = obj.clone();
    let mut changed = false;

    for (key, mask) in shape {
        let Some(current) = result.get(key) else {
            continue;
        };

        match (mask, current) {
            (Value::Object(nested_mask), Value::Object(child)) if !nested_mask.is_empty() => {
                let pruned = prune(child, nested_mask);
                if !pruned.changed {
                    continue;
                }
                changed = true;
                if pruned.result.is_empty() {
                    result.shift_remove(key);
                } else {
                    result.insert(key.clone(), Value::Object(pruned.result));
                }
            }
            _ => {
                result.shift_remove(key);
                changed = true;
            }
        }
    }

    Pruned { changed, result }
}

/// Remove keys starting with a prefix from the tables at dotted paths.
///
/// `{"mcp_servers": "poe"}` drops `mcp_servers.poe`, `mcp_servers.poe-docs`
/// and so on. Returns whether anything was removed.
pub fn prune_by_prefix(obj: &mut ConfigObject, prefixes: &BTreeMap<String, String>) -> bool {
    let mut changed = false;
    for (table_path, prefix) in prefixes {
        let Some(table) = table_at_mut(obj, table_path) else {
            continue;
        };
        let before = table.len();
        table.retain(|key, _| !key.starts_with(prefix.as_str()));
        changed |= table.len() != before;
    }
    changed
}

/// Remove exact `(table path, key)` entries.
///
/// `("mcp_servers", "poe")` drops `mcp_servers.poe` and nothing else, so
/// siblings such as `poetry` survive. Returns whether anything was removed.
pub fn remove_entries(obj: &mut ConfigObject, entries: &[(String, String)]) -> bool {
    let mut changed = false;
    for (table_path, key) in entries {
        if let Some(table) = table_at_mut(obj, table_path) {
            changed |= table.shift_remove(key).is_some();
        }
    }
    changed
}

fn table_at_mut<'a>(obj: &'a mut ConfigObject, dotted: &str) -> Option<&'a mut ConfigObject> {
    let mut current = obj;
    for segment in dotted.split('.').filter(|s| !s.is_empty()) {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> ConfigObject {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = obj(json!({"a": {"x": 1, "y": 2}, "b": true}));
        let patch = obj(json!({"a": {"y": 3, "z": 4}, "c": "new"}));
        let merged = deep_merge(&base, &patch);
        assert_eq!(
            Value::Object(merged.clone()),
            json!({"a": {"x": 1, "y": 3, "z": 4}, "b": true, "c": "new"})
        );
        let keys: Vec<_> = merged.keys().cloned().collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let base = obj(json!({"args": ["a", "b", "c"]}));
        let patch = obj(json!({"args": ["z"]}));
        assert_eq!(
            Value::Object(deep_merge(&base, &patch)),
            json!({"args": ["z"]})
        );
    }

    #[test]
    fn test_merge_scalar_over_object() {
        let base = obj(json!({"a": {"x": 1}}));
        let patch = obj(json!({"a": 5}));
        assert_eq!(Value::Object(deep_merge(&base, &patch)), json!({"a": 5}));
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let base = obj(json!({"a": {"x": 1}}));
        let patch = obj(json!({"a": {"y": 2}}));
        let _ = deep_merge(&base, &patch);
        assert_eq!(Value::Object(base), json!({"a": {"x": 1}}));
        assert_eq!(Value::Object(patch), json!({"a": {"y": 2}}));
    }

    #[test]
    fn test_prune_leaf() {
        let doc = obj(json!({"a": 1, "b": 2}));
        let pruned = prune(&doc, &obj(json!({"a": {}})));
        assert!(pruned.changed);
        assert_eq!(Value::Object(pruned.result), json!({"b": 2}));
    }

    #[test]
    fn test_prune_missing_key_is_noop() {
        let doc = obj(json!({"a": 1}));
        let pruned = prune(&doc, &obj(json!({"zzz": {}, "a": {"deep": {}}})));
        // "a" is a scalar under a nested mask: terminal deletion
        assert!(pruned.changed);
        assert!(pruned.result.is_empty());

        let untouched = prune(&doc, &obj(json!({"zzz": {}})));
        assert!(!untouched.changed);
        assert_eq!(Value::Object(untouched.result), json!({"a": 1}));
    }

    #[test]
    fn test_prune_cascades_empty_parents() {
        let doc = obj(json!({
            "l1": {"l2": {"l3": {"poe": {"command": "node"}}}},
            "keep": 1
        }));
        let shape = obj(json!({"l1": {"l2": {"l3": {"poe": {}}}}}));
        let pruned = prune(&doc, &shape);
        assert!(pruned.changed);
        assert_eq!(Value::Object(pruned.result), json!({"keep": 1}));
    }

    #[test]
    fn test_prune_keeps_non_empty_parent() {
        let doc = obj(json!({"mcpServers": {"poe": {}, "other": {"command": "x"}}}));
        let pruned = prune(&doc, &obj(json!({"mcpServers": {"poe": {}}})));
        assert_eq!(
            Value::Object(pruned.result),
            json!({"mcpServers": {"other": {"command": "x"}}})
        );
    }

    #[test]
    fn test_prune_inverts_merge_on_leaf() {
        let doc = obj(json!({"a": {"b": 1}}));
        let merged = deep_merge(&doc, &obj(json!({"k": "v"})));
        let shape = obj(json!({"k": {}}));
        assert_eq!(prune(&merged, &shape).result, prune(&doc, &shape).result);
    }

    #[test]
    fn test_prune_by_prefix() {
        let mut doc = obj(json!({
            "mcp_servers": {"poe": {"command": "a"}, "poe-docs": {}, "other": {}},
            "model": "x"
        }));
        let prefixes = BTreeMap::from([("mcp_servers".to_string(), "poe".to_string())]);
        assert!(prune_by_prefix(&mut doc, &prefixes));
        assert_eq!(
            Value::Object(doc.clone()),
            json!({"mcp_servers": {"other": {}}, "model": "x"})
        );
        assert!(!prune_by_prefix(&mut doc, &prefixes));
    }

    #[test]
    fn test_remove_entries_exact_key_only() {
        let mut doc = obj(json!({
            "mcp_servers": {"poe": {"command": "a"}, "poetry": {}, "poe-docs": {}},
            "model": "x"
        }));
        let entries = vec![("mcp_servers".to_string(), "poe".to_string())];
        assert!(remove_entries(&mut doc, &entries));
        assert_eq!(
            Value::Object(doc.clone()),
            json!({"mcp_servers": {"poetry": {}, "poe-docs": {}}, "model": "x"})
        );
        assert!(!remove_entries(&mut doc, &entries));
        assert!(!remove_entries(&mut doc, &[("a.b".to_string(), "poe".to_string())]));
    }

    #[test]
    fn test_prune_by_prefix_missing_table() {
        let mut doc = obj(json!({"model": "x"}));
        let prefixes = BTreeMap::from([("a.b".to_string(), "poe".to_string())]);
        assert!(!prune_by_prefix(&mut doc, &prefixes));
    }
}
