// meridian-core/src/domain/policy/view.rs
//
// `ScopedView`: the ACL-scoped, check-only view of a `PolicyContainer` handed
// to a particular user. It never mutates the underlying
// container; `manage_object` only answers whether the update pipeline is
// allowed to apply a change on the user's behalf.

use crate::domain::model::{weight_ordered, Object, Rule, RuleEffect, RuleScope, User};
use crate::domain::policy::container::PolicyContainer;

pub struct ScopedView<'c> {
    container: &'c PolicyContainer,
    user: &'c User,
}

impl<'c> ScopedView<'c> {
    pub fn new(container: &'c PolicyContainer, user: &'c User) -> Self {
        Self { container, user }
    }

    /// Domain admins bypass rule evaluation entirely; everyone else needs an
    /// `Acl` rule scoped to `object`'s namespace whose `match_labels` are a
    /// subset of the user's labels and whose effect is `Allow`, with no
    /// lower-weight `Deny` rule for the same namespace matching first.
    pub fn can_manage(&self, object: &Object) -> bool {
        if self.user.is_domain_admin() {
            return true;
        }

        let acl_rules: Vec<&Rule> = self
            .container
            .objects()
            .filter_map(|o| match o {
                Object::Rule(r) => Some(r),
                _ => None,
            })
            .filter(|r| matches!(&r.scope, RuleScope::Acl { namespace } if namespace == object.namespace()))
            .filter(|r| r.labels_match(&self.user.labels))
            .collect();

        for rule in weight_ordered(acl_rules) {
            match &rule.effect {
                RuleEffect::Allow => return true,
                RuleEffect::Deny => return false,
                RuleEffect::RouteCluster { .. } => continue,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AclRole, ObjectMeta, Service};
    use std::collections::HashMap;

    fn admin() -> User {
        User { meta: ObjectMeta::new("p", "root"), labels: HashMap::new(), role: AclRole::DomainAdmin }
    }

    fn operator() -> User {
        User { meta: ObjectMeta::new("p", "alice"), labels: HashMap::new(), role: AclRole::Operator }
    }

    fn service_in(ns: &str) -> Object {
        Object::Service(Service { meta: ObjectMeta::new(ns, "kafka"), components: vec![] })
    }

    #[test]
    fn domain_admin_bypasses_rule_evaluation() {
        let container = PolicyContainer::new();
        let admin = admin();
        let view = ScopedView::new(&container, &admin);
        assert!(view.can_manage(&service_in("secure")));
    }

    #[test]
    fn operator_without_matching_rule_is_denied() {
        let container = PolicyContainer::new();
        let operator = operator();
        let view = ScopedView::new(&container, &operator);
        assert!(!view.can_manage(&service_in("secure")));
    }

    #[test]
    fn operator_with_allow_rule_is_permitted() {
        let mut container = PolicyContainer::new();
        let rule = Object::Rule(Rule {
            meta: ObjectMeta::new("secure", "grant"),
            weight: 10,
            scope: RuleScope::Acl { namespace: "secure".into() },
            match_labels: HashMap::new(),
            effect: RuleEffect::Allow,
        });
        container.add_object(rule).unwrap();
        let operator = operator();
        let view = ScopedView::new(&container, &operator);
        assert!(view.can_manage(&service_in("secure")));
    }
}
