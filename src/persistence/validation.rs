//! Shape checks for namespace keys, state values and envelopes
//!
//! Pure predicates. Writes are checked against the namespace schema, reads
//! against the envelope shape, so corrupt or foreign data is rejected
//! without an error ever reaching the caller.

use serde_json::Value;

use super::namespace::Namespace;

/// True iff `key` names one of the registered namespaces
pub fn is_known_namespace(key: &str) -> bool {
    Namespace::from_key(key).is_some()
}

/// True iff `value` is an object carrying every required top-level field.
///
/// Presence only; field types are not inspected.
pub fn matches_schema(namespace: Namespace, value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    namespace
        .required_fields()
        .iter()
        .all(|field| object.contains_key(*field))
}

/// True iff `envelope` is an object with `data`, numeric `timestamp` and numeric `version`
pub fn is_well_formed_envelope(envelope: &Value) -> bool {
    let Some(object) = envelope.as_object() else {
        return false;
    };
    object.contains_key("data")
        && object.get("timestamp").is_some_and(Value::is_number)
        && object.get("version").is_some_and(Value::is_number)
}
