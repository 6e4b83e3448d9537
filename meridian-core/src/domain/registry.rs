// meridian-core/src/domain/registry.rs
//
// The typed object catalog. Each kind declares its `TypeInfo` statically —
// no runtime reflection.

use std::collections::HashMap;

use crate::domain::model::{Object, ALL_KINDS, KIND_CLAIM, KIND_CLUSTER, KIND_CONTRACT, KIND_RULE, KIND_SERVICE, KIND_USER};

/// Converts a field's value on an object into the string used as a `listgen`
/// index key component. Declared per indexed field so callers never need to
/// pattern-match on `Object` themselves.
pub type ValueTransform = fn(&Object) -> Option<String>;

/// Static description of one object kind: whether it keeps history, and which
/// fields are indexed (with how to stringify each one).
#[derive(Clone)]
pub struct TypeInfo {
    pub kind: &'static str,
    pub versioned: bool,
    pub index_fields: Vec<(&'static str, ValueTransform)>,
}

impl TypeInfo {
    pub fn index_field(&self, field: &str) -> Option<ValueTransform> {
        self.index_fields.iter().find(|(f, _)| *f == field).map(|(_, t)| *t)
    }
}

/// The catalog of all known kinds, queried by the index layer and generational
/// store. Immutable after construction; scoped to whoever owns it (no process
/// global).
pub struct Catalog {
    by_kind: HashMap<&'static str, TypeInfo>,
}

impl Catalog {
    /// Builds the catalog with the fixed set of policy entity kinds.
    pub fn standard() -> Self {
        let mut by_kind = HashMap::new();

        by_kind.insert(
            KIND_SERVICE,
            TypeInfo { kind: KIND_SERVICE, versioned: true, index_fields: vec![] },
        );
        by_kind.insert(
            KIND_CONTRACT,
            TypeInfo { kind: KIND_CONTRACT, versioned: true, index_fields: vec![] },
        );
        by_kind.insert(
            KIND_CLUSTER,
            TypeInfo {
                kind: KIND_CLUSTER,
                versioned: true,
                index_fields: vec![("driver_type", index_cluster_driver_type)],
            },
        );
        by_kind.insert(
            KIND_RULE,
            TypeInfo { kind: KIND_RULE, versioned: true, index_fields: vec![] },
        );
        by_kind.insert(
            KIND_CLAIM,
            TypeInfo {
                kind: KIND_CLAIM,
                versioned: true,
                index_fields: vec![("contract_name", index_claim_contract_name)],
            },
        );
        by_kind.insert(
            KIND_USER,
            TypeInfo { kind: KIND_USER, versioned: true, index_fields: vec![] },
        );

        debug_assert_eq!(by_kind.len(), ALL_KINDS.len());
        Self { by_kind }
    }

    pub fn lookup(&self, kind: &str) -> Option<&TypeInfo> {
        self.by_kind.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &TypeInfo> {
        self.by_kind.values()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn index_cluster_driver_type(obj: &Object) -> Option<String> {
    match obj {
        Object::Cluster(c) => Some(c.driver_type.clone()),
        _ => None,
    }
}

fn index_claim_contract_name(obj: &Object) -> Option<String> {
    match obj {
        Object::Claim(c) => Some(c.contract_name.clone()),
        _ => None,
    }
}
