// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metadata cloning and deep merging.
//!
//! Caller metadata is never modified: every call builds a fresh map from a
//! clone of it and merges the target descriptor on top.

use serde_json::Value;

use crate::types::{Metadata, TargetDescriptor};

/// Recursively merge `overlay` into `base`.
///
/// Objects are merged key by key; any other overlay value (including arrays)
/// replaces what `base` holds under that key.
pub fn deep_merge(base: &mut Metadata, overlay: &Metadata) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Like [`deep_merge`], taking the overlay by value.
pub fn merged(mut base: Metadata, overlay: &Metadata) -> Metadata {
    deep_merge(&mut base, overlay);
    base
}

/// Build the metadata attached to every event of one call.
///
/// The descriptor's keys win over anything the caller put under `target`;
/// other caller keys under `target` survive.
pub fn target_metadata(metadata: Option<&Metadata>, target: &TargetDescriptor) -> Metadata {
    let base = metadata.cloned().unwrap_or_default();

    let mut overlay = Metadata::new();
    overlay.insert("target".to_string(), target.to_value());

    merged(base, &overlay)
}

/// Wrap loose fields in a map, for callers building `extra` payloads.
pub fn object(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> TargetDescriptor {
        TargetDescriptor::new("1.0", "DynamoDB", "getItem")
    }

    #[test]
    fn test_deep_merge_nested_objects() {
        let mut base = object(json!({"a": {"b": 1, "c": 2}, "d": 3}));
        let overlay = object(json!({"a": {"c": 20, "e": 5}}));

        deep_merge(&mut base, &overlay);

        assert_eq!(
            Value::Object(base),
            json!({"a": {"b": 1, "c": 20, "e": 5}, "d": 3})
        );
    }

    #[test]
    fn test_deep_merge_replaces_non_objects() {
        let mut base = object(json!({"a": [1, 2, 3], "b": "text"}));
        let overlay = object(json!({"a": [9], "b": {"now": "object"}}));

        deep_merge(&mut base, &overlay);

        assert_eq!(Value::Object(base), json!({"a": [9], "b": {"now": "object"}}));
    }

    #[test]
    fn test_target_metadata_without_caller_metadata() {
        let metadata = target_metadata(None, &descriptor());
        assert_eq!(
            Value::Object(metadata),
            json!({"target": {"module": "aws-sdk", "version": "1.0", "export": "DynamoDB", "method": "getItem"}})
        );
    }

    #[test]
    fn test_target_metadata_keeps_caller_keys() {
        let caller = object(json!({"some": "metadata", "nested": {"deep": true}}));
        let metadata = target_metadata(Some(&caller), &descriptor());

        assert_eq!(metadata["some"], json!("metadata"));
        assert_eq!(metadata["nested"], json!({"deep": true}));
        assert_eq!(metadata["target"]["method"], json!("getItem"));
    }

    #[test]
    fn test_target_metadata_descriptor_wins() {
        let caller = object(json!({"target": {"method": "stale", "region": "us-east-1"}}));
        let metadata = target_metadata(Some(&caller), &descriptor());

        assert_eq!(metadata["target"]["method"], json!("getItem"));
        assert_eq!(metadata["target"]["region"], json!("us-east-1"));
    }

    #[test]
    fn test_target_metadata_does_not_touch_caller() {
        let caller = object(json!({"target": {"method": "stale"}, "some": "metadata"}));
        let before = caller.clone();

        let mut metadata = target_metadata(Some(&caller), &descriptor());
        metadata.insert("some".to_string(), json!("changed"));

        assert_eq!(caller, before);
    }

    #[test]
    fn test_object_from_non_object() {
        assert!(object(json!([1, 2])).is_empty());
        assert_eq!(object(json!({"a": 1})).len(), 1);
    }
}
