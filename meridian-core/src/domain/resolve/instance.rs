// meridian-core/src/domain/resolve/instance.rs
//
// A resolved component instance and its deterministic identity: two claims
// whose ancestor chains are structurally identical collapse
// to the same `InstanceKey`, so the resolver naturally shares instances
// across claims instead of creating duplicates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::model::ComponentSpec;

/// A step in the ancestor chain hashed to produce an `InstanceKey`: the
/// `(contract, context, component)` triple plus the cluster the step
/// ultimately lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorStep {
    pub contract_namespace: String,
    pub contract_name: String,
    pub context_name: String,
    pub component_name: String,
    pub cluster_namespace: String,
    pub cluster_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey(pub String);

impl InstanceKey {
    /// Hashes the ancestor chain with a `\u{1}`-separated, field-tagged
    /// encoding so no combination of field values can collide across a
    /// different split of the same fields.
    pub fn from_chain(chain: &[AncestorStep]) -> Self {
        let mut hasher = Sha256::new();
        for step in chain {
            hasher.update(b"contract\x01");
            hasher.update(step.contract_namespace.as_bytes());
            hasher.update(b"\x01");
            hasher.update(step.contract_name.as_bytes());
            hasher.update(b"\x02context\x01");
            hasher.update(step.context_name.as_bytes());
            hasher.update(b"\x02component\x01");
            hasher.update(step.component_name.as_bytes());
            hasher.update(b"\x02cluster\x01");
            hasher.update(step.cluster_namespace.as_bytes());
            hasher.update(b"\x01");
            hasher.update(step.cluster_name.as_bytes());
            hasher.update(b"\x03");
        }
        InstanceKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved component, ready for the diff/action planner and for
/// dispatch to a `ClusterDriver`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub key: InstanceKey,
    pub claim_namespace: String,
    pub claim_name: String,
    pub component_name: String,
    pub cluster_namespace: String,
    pub cluster_name: String,
    pub parameters: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub spec: ComponentSpec,
}

impl Instance {
    pub fn dependency_of(&self, other: &Instance) -> bool {
        self.key != other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(suffix: &str) -> AncestorStep {
        AncestorStep {
            contract_namespace: "ns".into(),
            contract_name: format!("contract-{suffix}"),
            context_name: "prod".into(),
            component_name: "web".into(),
            cluster_namespace: "ns".into(),
            cluster_name: "cluster-a".into(),
        }
    }

    #[test]
    fn identical_chains_share_an_instance_key() {
        let a = InstanceKey::from_chain(&[step("x")]);
        let b = InstanceKey::from_chain(&[step("x")]);
        assert_eq!(a, b);
    }

    #[test]
    fn divergent_chains_produce_distinct_keys() {
        let a = InstanceKey::from_chain(&[step("x")]);
        let b = InstanceKey::from_chain(&[step("y")]);
        assert_ne!(a, b);
    }

    #[test]
    fn field_split_does_not_collide() {
        // "ab"+"c" vs "a"+"bc" across adjacent fields must not hash equal.
        let mut s1 = step("x");
        s1.contract_name = "ab".into();
        s1.context_name = "c".into();
        let mut s2 = step("x");
        s2.contract_name = "a".into();
        s2.context_name = "bc".into();
        assert_ne!(InstanceKey::from_chain(&[s1]), InstanceKey::from_chain(&[s2]));
    }
}
