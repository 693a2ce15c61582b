use serde_json::Value;

/// Advisory change description carried alongside a patch event.
///
/// The service sends a complete document snapshot with every patch, so these
/// operations are never used to compute state. They exist for consumers that
/// want to highlight what just changed.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchOperation {
    /// A field was set to a value (string, integer, or null).
    Set { field: String, value: Value },
    /// A string was appended to the `key_points` list.
    Append { field: String, value: String },
    /// Explicit completion marker. Rare; completion is normally signalled by
    /// the `done` flag on the patch event itself.
    Done,
}

/// Classifies a raw `delta` object into a known operation.
///
/// Total over the three known `op` tags; any other tag or malformed shape
/// yields `None` so unknown operations never block folding. `set` on an
/// unrecognized field name is forwarded uninterpreted.
pub fn classify(raw: &Value) -> Option<PatchOperation> {
    match raw.get("op")?.as_str()? {
        "set" => {
            let field = raw.get("field")?.as_str()?.to_string();
            let value = raw.get("value").cloned().unwrap_or(Value::Null);
            Some(PatchOperation::Set { field, value })
        }
        "append" => {
            let field = raw.get("field")?.as_str()?.to_string();
            let value = raw.get("value")?.as_str()?.to_string();
            Some(PatchOperation::Append { field, value })
        }
        "done" => Some(PatchOperation::Done),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_set_with_string_and_null_values() {
        let set = classify(&json!({"op":"set","field":"title","value":"X"}));
        assert_eq!(
            set,
            Some(PatchOperation::Set {
                field: "title".into(),
                value: json!("X"),
            })
        );
        let cleared = classify(&json!({"op":"set","field":"category"}));
        assert_eq!(
            cleared,
            Some(PatchOperation::Set {
                field: "category".into(),
                value: Value::Null,
            })
        );
    }

    #[test]
    fn set_on_unrecognized_field_is_forwarded() {
        let op = classify(&json!({"op":"set","field":"not_a_summary_field","value":1}));
        assert!(matches!(op, Some(PatchOperation::Set { field, .. }) if field == "not_a_summary_field"));
    }

    #[test]
    fn classifies_append_and_done() {
        let append = classify(&json!({"op":"append","field":"key_points","value":"p3"}));
        assert_eq!(
            append,
            Some(PatchOperation::Append {
                field: "key_points".into(),
                value: "p3".into(),
            })
        );
        assert_eq!(classify(&json!({"op":"done"})), Some(PatchOperation::Done));
    }

    #[test]
    fn unknown_or_malformed_operations_yield_none() {
        assert_eq!(classify(&json!({"op":"merge","field":"title"})), None);
        assert_eq!(classify(&json!({"field":"title"})), None);
        assert_eq!(classify(&json!({"op":"append","field":"key_points"})), None);
        assert_eq!(classify(&json!("set")), None);
    }
}
