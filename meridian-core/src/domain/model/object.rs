// meridian-core/src/domain/model/object.rs

use serde::{Deserialize, Serialize};

use super::claim::Claim;
use super::cluster::Cluster;
use super::contract::Contract;
use super::meta::{Generation, Key, ObjectRef};
use super::rule::Rule;
use super::service::Service;
use super::user::User;

/// The tagged union of every recognized policy entity kind.
///
/// Modelled as a closed `enum` rather than an open-ended hierarchy: the set
/// of kinds is fixed and known at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    Service(Service),
    Contract(Contract),
    Cluster(Cluster),
    Rule(Rule),
    Claim(Claim),
    User(User),
}

/// All kinds are versioned in this implementation: every mutation is a new
/// generation kept in history (no non-versioned kind is declared among the
/// policy entities, so `TypeInfo::versioned` is always `true` here; the
/// registry still checks it explicitly to keep the `Save` code path generic
/// over future non-versioned kinds).
pub const KIND_SERVICE: &str = "Service";
pub const KIND_CONTRACT: &str = "Contract";
pub const KIND_CLUSTER: &str = "Cluster";
pub const KIND_RULE: &str = "Rule";
pub const KIND_CLAIM: &str = "Claim";
pub const KIND_USER: &str = "User";

pub const ALL_KINDS: &[&str] =
    &[KIND_SERVICE, KIND_CONTRACT, KIND_CLUSTER, KIND_RULE, KIND_CLAIM, KIND_USER];

impl Object {
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Service(_) => KIND_SERVICE,
            Object::Contract(_) => KIND_CONTRACT,
            Object::Cluster(_) => KIND_CLUSTER,
            Object::Rule(_) => KIND_RULE,
            Object::Claim(_) => KIND_CLAIM,
            Object::User(_) => KIND_USER,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Object::Service(o) => &o.meta.namespace,
            Object::Contract(o) => &o.meta.namespace,
            Object::Cluster(o) => &o.meta.namespace,
            Object::Rule(o) => &o.meta.namespace,
            Object::Claim(o) => &o.meta.namespace,
            Object::User(o) => &o.meta.namespace,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Object::Service(o) => &o.meta.name,
            Object::Contract(o) => &o.meta.name,
            Object::Cluster(o) => &o.meta.name,
            Object::Rule(o) => &o.meta.name,
            Object::Claim(o) => &o.meta.name,
            Object::User(o) => &o.meta.name,
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            Object::Service(o) => o.meta.generation,
            Object::Contract(o) => o.meta.generation,
            Object::Cluster(o) => o.meta.generation,
            Object::Rule(o) => o.meta.generation,
            Object::Claim(o) => o.meta.generation,
            Object::User(o) => o.meta.generation,
        }
    }

    pub fn set_generation(&mut self, r#gen: Generation) {
        match self {
            Object::Service(o) => o.meta.generation = r#gen,
            Object::Contract(o) => o.meta.generation = r#gen,
            Object::Cluster(o) => o.meta.generation = r#gen,
            Object::Rule(o) => o.meta.generation = r#gen,
            Object::Claim(o) => o.meta.generation = r#gen,
            Object::User(o) => o.meta.generation = r#gen,
        }
    }

    pub fn key(&self) -> Key {
        Key::new(self.namespace().to_string(), self.kind(), self.name().to_string())
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(&self.key(), self.generation())
    }

    /// Returns a clone of `self` with `generation` reset to `0`, the shape
    /// compared by the generational store's content-equality check, which
    /// ignores the generation field.
    pub fn with_generation_erased(&self) -> Object {
        let mut clone = self.clone();
        clone.set_generation(0);
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::meta::ObjectMeta;
    use crate::domain::model::service::Service;

    #[test]
    fn kind_namespace_name_accessors_agree_with_key() {
        let obj = Object::Service(Service { meta: ObjectMeta::new("p", "kafka"), components: vec![] });
        assert_eq!(obj.kind(), KIND_SERVICE);
        assert_eq!(obj.namespace(), "p");
        assert_eq!(obj.name(), "kafka");
        assert_eq!(obj.key().to_string(), "p/Service/kafka");
    }

    #[test]
    fn generation_erasure_ignores_only_generation() {
        let mut obj = Object::Service(Service { meta: ObjectMeta::new("p", "kafka"), components: vec![] });
        obj.set_generation(7);
        let mut other = obj.clone();
        other.set_generation(1);
        assert_eq!(obj.with_generation_erased(), other.with_generation_erased());
        assert_ne!(obj, other);
    }
}
