// meridian-core/src/domain/model/rule.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::meta::ObjectMeta;

/// An ACL or routing rule, evaluated in weight order; first match wins per scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub weight: i64,
    pub scope: RuleScope,
    /// Labels that must be a subset of the subject's labels for this rule to match
    /// (user labels for an `Acl` scope, claim labels for a `Contract` scope).
    #[serde(default)]
    pub match_labels: HashMap<String, String>,
    pub effect: RuleEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleScope {
    /// ACL rule: governs whether a non-admin user may manage objects in `namespace`.
    Acl { namespace: String },
    /// Routing rule: governs claims against `contract` (`"*"` matches any contract).
    Contract { contract: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleEffect {
    Allow,
    Deny,
    /// Routing override: force the resolved instance onto a specific cluster.
    RouteCluster { cluster_namespace: String, cluster_name: String },
}

impl Rule {
    pub fn labels_match(&self, subject_labels: &HashMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| subject_labels.get(k).map(|sv| sv == v).unwrap_or(false))
    }
}

/// Sorts rules by ascending weight, breaking ties on `(namespace, name)` for determinism.
pub fn weight_ordered(mut rules: Vec<&Rule>) -> Vec<&Rule> {
    rules.sort_by(|a, b| {
        a.weight
            .cmp(&b.weight)
            .then_with(|| a.meta.namespace.cmp(&b.meta.namespace))
            .then_with(|| a.meta.name.cmp(&b.meta.name))
    });
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, weight: i64) -> Rule {
        Rule {
            meta: ObjectMeta::new("p", name),
            weight,
            scope: RuleScope::Acl { namespace: "p".into() },
            match_labels: HashMap::new(),
            effect: RuleEffect::Allow,
        }
    }

    #[test]
    fn weight_ordered_is_ascending_then_lexicographic() {
        let a = rule("b", 10);
        let b = rule("a", 10);
        let c = rule("z", 1);
        let ordered = weight_ordered(vec![&a, &b, &c]);
        let names: Vec<&str> = ordered.iter().map(|r| r.meta.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn labels_match_requires_subset() {
        let mut r = rule("a", 1);
        r.match_labels.insert("env".into(), "prod".into());
        let mut labels = HashMap::new();
        assert!(!r.labels_match(&labels));
        labels.insert("env".to_string(), "prod".to_string());
        assert!(r.labels_match(&labels));
    }
}
