// meridian-core/src/domain/codec.rs
//
// Canonical marshaling (`marshal`/`unmarshal`/`marshal_many`). The wire
// format is JSON with sorted object keys and no incidental whitespace, so
// two logically-equal objects always marshal to identical bytes: the
// generational store's content-equality check is a byte compare on this
// output, not a structural `==`.

use serde_json::Value;

use crate::domain::error::DomainError;
use crate::domain::model::Object;

/// Recursively sorts every JSON object's keys. `serde_json::to_vec` already
/// preserves insertion order (map keys come from struct field order via
/// derive), so canonicalization here means normalizing through a `BTreeMap`-
/// backed re-serialization rather than relying on incidental struct layout.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k, canonicalize(v));
            }
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Marshals one object to its canonical byte form.
pub fn marshal(object: &Object) -> Result<Vec<u8>, DomainError> {
    let value = serde_json::to_value(object)
        .map_err(|e| DomainError::ShapeMismatch { expected: "Object".into(), actual: e.to_string() })?;
    let canonical = canonicalize(value);
    serde_json::to_vec(&canonical)
        .map_err(|e| DomainError::ShapeMismatch { expected: "Object".into(), actual: e.to_string() })
}

/// Marshals a sequence of objects to one canonical byte form.
pub fn marshal_many(objects: &[Object]) -> Result<Vec<u8>, DomainError> {
    let values: Result<Vec<Value>, DomainError> = objects
        .iter()
        .map(|o| {
            serde_json::to_value(o)
                .map(canonicalize)
                .map_err(|e| DomainError::ShapeMismatch { expected: "Object".into(), actual: e.to_string() })
        })
        .collect();
    serde_json::to_vec(&values?)
        .map_err(|e| DomainError::ShapeMismatch { expected: "[]Object".into(), actual: e.to_string() })
}

/// Unmarshals a single object. Fails with `UnknownKind` if the `kind` tag
/// does not name one of the registered kinds (surfaced as a serde error
/// mentioning the `kind` field; the registry validates the full set
/// elsewhere, this just reflects what serde's internally-tagged enum saw).
pub fn unmarshal(bytes: &[u8]) -> Result<Object, DomainError> {
    serde_json::from_slice(bytes).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("unknown variant") {
            DomainError::UnknownKind(msg)
        } else {
            DomainError::ShapeMismatch { expected: "Object".into(), actual: msg }
        }
    })
}

pub fn unmarshal_many(bytes: &[u8]) -> Result<Vec<Object>, DomainError> {
    serde_json::from_slice(bytes).map_err(|e| DomainError::ShapeMismatch {
        expected: "[]Object".into(),
        actual: e.to_string(),
    })
}

/// `with_generation_erased` equality: used by the generational store's save
/// path to decide whether content actually changed.
pub fn content_equal(a: &Object, b: &Object) -> bool {
    match (marshal(&a.with_generation_erased()), marshal(&b.with_generation_erased())) {
        (Ok(ba), Ok(bb)) => ba == bb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Object, ObjectMeta, Service};

    fn service(name: &str) -> Object {
        Object::Service(Service { meta: ObjectMeta::new("p", name), components: vec![] })
    }

    #[test]
    fn marshal_is_canonical_across_field_orders() {
        let a = marshal(&service("kafka")).unwrap();
        let b = marshal(&service("kafka")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn round_trips_through_unmarshal() {
        let obj = service("kafka");
        let bytes = marshal(&obj).unwrap();
        let back = unmarshal(&bytes).unwrap();
        assert_eq!(obj, back);
    }

    #[test]
    fn content_equal_ignores_generation() {
        let mut a = service("kafka");
        a.set_generation(1);
        let mut b = service("kafka");
        b.set_generation(9);
        assert!(content_equal(&a, &b));
    }

    #[test]
    fn unknown_kind_is_reported() {
        let bytes = br#"{"kind":"Bogus","namespace":"p","name":"x"}"#;
        let err = unmarshal(bytes).unwrap_err();
        assert!(matches!(err, DomainError::UnknownKind(_)));
    }
}
