// meridian-core/src/domain/policy/validate.rs
//
// `Validate()`: referential integrity, rule-weight uniqueness within scope,
// and acyclic intra-service dependencies. Every check collects its own
// offenders rather than short-circuiting on the first.

use std::collections::HashMap;

use crate::domain::error::{DomainError, Offender};
use crate::domain::model::{ComponentSpec, Key, Object, RuleScope};
use crate::domain::policy::container::PolicyContainer;

pub fn validate_policy(container: &PolicyContainer) -> Result<(), DomainError> {
    let mut offenders = Vec::new();

    check_referential_integrity(container, &mut offenders);
    check_rule_weight_uniqueness(container, &mut offenders);
    check_service_dependency_cycles(container, &mut offenders);

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(DomainError::ValidationError { offenders })
    }
}

fn check_referential_integrity(container: &PolicyContainer, offenders: &mut Vec<Offender>) {
    for object in container.objects() {
        match object {
            Object::Contract(contract) => {
                for context in &contract.contexts {
                    let key = Key::new(
                        context.allocation.service_namespace.clone(),
                        "Service",
                        context.allocation.service_name.clone(),
                    );
                    if container.get_object(&key).is_none() {
                        offenders.push(Offender {
                            object: object.object_ref(),
                            reason: format!("context '{}' allocates unknown service {key}", context.name),
                        });
                    }
                }
            }
            Object::Service(service) => {
                for component in &service.components {
                    if let ComponentSpec::ServiceRef { contract_namespace, contract_name } = &component.spec {
                        let key = Key::new(contract_namespace.clone(), "Contract", contract_name.clone());
                        if container.get_object(&key).is_none() {
                            offenders.push(Offender {
                                object: object.object_ref(),
                                reason: format!(
                                    "component '{}' references unknown contract {key}",
                                    component.name
                                ),
                            });
                        }
                    }
                }
            }
            Object::Claim(claim) => {
                let contract_key =
                    Key::new(claim.contract_namespace.clone(), "Contract", claim.contract_name.clone());
                if container.get_object(&contract_key).is_none() {
                    offenders.push(Offender {
                        object: object.object_ref(),
                        reason: format!("claim targets unknown contract {contract_key}"),
                    });
                }
                let user_key = Key::new(claim.user_namespace.clone(), "User", claim.user_name.clone());
                if container.get_object(&user_key).is_none() {
                    offenders.push(Offender {
                        object: object.object_ref(),
                        reason: format!("claim targets unknown user {user_key}"),
                    });
                }
            }
            Object::Rule(rule) => {
                if let crate::domain::model::RuleEffect::RouteCluster { cluster_namespace, cluster_name } =
                    &rule.effect
                {
                    let key = Key::new(cluster_namespace.clone(), "Cluster", cluster_name.clone());
                    if container.get_object(&key).is_none() {
                        offenders.push(Offender {
                            object: object.object_ref(),
                            reason: format!("rule routes to unknown cluster {key}"),
                        });
                    }
                }
            }
            Object::Cluster(_) | Object::User(_) => {}
        }
    }
}

fn check_rule_weight_uniqueness(container: &PolicyContainer, offenders: &mut Vec<Offender>) {
    let mut seen: HashMap<String, Vec<&Object>> = HashMap::new();
    for object in container.objects() {
        if let Object::Rule(rule) = object {
            let scope_key = match &rule.scope {
                RuleScope::Acl { namespace } => format!("acl:{namespace}:{}", rule.weight),
                RuleScope::Contract { contract } => format!("contract:{contract}:{}", rule.weight),
            };
            seen.entry(scope_key).or_default().push(object);
        }
    }
    for (scope_key, objects) in seen {
        if objects.len() > 1 {
            for object in objects {
                offenders.push(Offender {
                    object: object.object_ref(),
                    reason: format!("weight not unique within scope '{scope_key}'"),
                });
            }
        }
    }
}

fn check_service_dependency_cycles(container: &PolicyContainer, offenders: &mut Vec<Offender>) {
    for object in container.objects() {
        if let Object::Service(service) = object {
            if service.has_dependency_cycle() {
                offenders.push(Offender {
                    object: object.object_ref(),
                    reason: "component dependency cycle within service".to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Allocation, Context, Contract, ObjectMeta, Predicate};
    use std::collections::HashMap as Map;

    #[test]
    fn contract_allocating_unknown_service_is_an_offender() {
        let mut container = PolicyContainer::new();
        let contract = Object::Contract(Contract {
            meta: ObjectMeta::new("p", "web"),
            contexts: vec![Context {
                name: "default".into(),
                predicate: Predicate::Default,
                allocation: Allocation { service_namespace: "p".into(), service_name: "ghost".into() },
                parameters: Map::new(),
            }],
        });
        container.add_object(contract).unwrap();
        let err = validate_policy(&container).unwrap_err();
        match err {
            DomainError::ValidationError { offenders } => assert_eq!(offenders.len(), 1),
            _ => panic!("expected ValidationError"),
        }
    }

    #[test]
    fn empty_container_validates() {
        let container = PolicyContainer::new();
        assert!(validate_policy(&container).is_ok());
    }
}
