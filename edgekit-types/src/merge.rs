//! JSON merge helpers with the pipeline's merge semantics.
//!
//! `deep_merge` is right-biased per leaf key: objects merge recursively,
//! anything else (scalars, arrays) is replaced wholesale. `shallow_merge`
//! only touches top-level keys and is used to fold component hook results
//! into a single command result.

use serde_json::{Map, Value};

/// Recursively merges `source` into `target`, later values winning per leaf.
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Merges `source`'s top-level keys into `target`, replacing existing keys.
pub fn shallow_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn deep_merge_is_right_biased_per_leaf() {
        let mut target = obj(json!({ "a": { "x": 1, "y": 1 } }));
        deep_merge(&mut target, &obj(json!({ "a": { "x": 2 } })));
        assert_eq!(Value::Object(target), json!({ "a": { "x": 2, "y": 1 } }));
    }

    #[test]
    fn deep_merge_is_idempotent() {
        let source = obj(json!({ "a": { "x": 2 }, "b": [1, 2] }));
        let mut target = obj(json!({ "a": { "x": 1 } }));
        deep_merge(&mut target, &source);
        let once = target.clone();
        deep_merge(&mut target, &source);
        assert_eq!(target, once);
    }

    #[test]
    fn deep_merge_replaces_arrays_wholesale() {
        let mut target = obj(json!({ "list": [1, 2, 3] }));
        deep_merge(&mut target, &obj(json!({ "list": [4] })));
        assert_eq!(Value::Object(target), json!({ "list": [4] }));
    }

    #[test]
    fn shallow_merge_replaces_top_level_keys() {
        let mut target = obj(json!({ "a": { "x": 1 }, "b": 1 }));
        shallow_merge(&mut target, &obj(json!({ "a": { "y": 2 }, "c": 3 })));
        assert_eq!(
            Value::Object(target),
            json!({ "a": { "y": 2 }, "b": 1, "c": 3 })
        );
    }
}
