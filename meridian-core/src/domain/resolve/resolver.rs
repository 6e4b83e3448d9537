// meridian-core/src/domain/resolve/resolver.rs
//
// The claims-to-instance-graph resolver. Deterministic given the same
// inputs: claims are processed in `(namespace, name)` order, contexts and
// components are walked in their declared order, and the only
// non-deterministic input -- cluster selection when no rule names one -- is
// itself resolved by a stable lexicographic pick over healthy clusters.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::domain::error::DomainError;
use crate::domain::model::{
    weight_ordered, Claim, Key, Object, Rule, RuleEffect, RuleScope, Service,
};
use crate::domain::policy::container::PolicyContainer;
use crate::domain::resolve::desired_state::DesiredState;
use crate::domain::resolve::events::ResolveEvent;
use crate::domain::resolve::instance::{AncestorStep, Instance, InstanceKey};
use crate::ports::external_data::ExternalDataProvider;
use crate::ports::template::TemplateEngine;

pub struct Resolver<'a> {
    policy: &'a PolicyContainer,
    external: &'a dyn ExternalDataProvider,
    templates: &'a dyn TemplateEngine,
}

struct ContractFrame {
    contract_namespace: String,
    contract_name: String,
}

impl<'a> Resolver<'a> {
    pub fn new(
        policy: &'a PolicyContainer,
        external: &'a dyn ExternalDataProvider,
        templates: &'a dyn TemplateEngine,
    ) -> Self {
        Self { policy, external, templates }
    }

    pub fn resolve(&self) -> Result<(DesiredState, Vec<ResolveEvent>), DomainError> {
        let mut claims: Vec<&Claim> = self
            .policy
            .objects()
            .filter_map(|o| match o {
                Object::Claim(c) => Some(c),
                _ => None,
            })
            .collect();
        claims.sort_by(|a, b| (&a.meta.namespace, &a.meta.name).cmp(&(&b.meta.namespace, &b.meta.name)));

        let mut state = DesiredState::new();
        let mut events = Vec::new();

        for claim in claims {
            self.resolve_claim(claim, &mut state, &mut events)?;
        }

        Ok((state, events))
    }

    fn resolve_claim(
        &self,
        claim: &Claim,
        state: &mut DesiredState,
        events: &mut Vec<ResolveEvent>,
    ) -> Result<(), DomainError> {
        let claim_key = Key::new(claim.meta.namespace.clone(), "Claim", claim.meta.name.clone());
        let user_key = Key::new(claim.user_namespace.clone(), "User", claim.user_name.clone());

        let user = match self.policy.get_object(&user_key) {
            Some(Object::User(u)) => u,
            _ => {
                events.push(ResolveEvent::MissingUser { claim: claim_key, user: user_key });
                return Ok(());
            }
        };

        let mut labels = self.external.user_labels(&claim.user_namespace, &claim.user_name);
        for (k, v) in &user.labels {
            labels.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &claim.labels {
            labels.insert(k.clone(), v.clone());
        }

        let mut discovery = serde_json::Map::new();
        let mut stack = Vec::new();
        let root = self.resolve_contract(
            &claim.contract_namespace,
            &claim.contract_name,
            &labels,
            &mut discovery,
            &mut stack,
            &[],
            state,
            events,
            &claim_key,
        )?;

        if let Some(root) = root {
            events.push(ResolveEvent::Resolved { claim: claim_key, root });
        }
        Ok(())
    }

    /// Resolves one `(contract, context)` step, returning the instance key of
    /// the sub-tree's canonical root, or `None` if the claim resolved to zero
    /// instances (no matching context, or an explicit deny).
    #[allow(clippy::too_many_arguments)]
    fn resolve_contract(
        &self,
        contract_namespace: &str,
        contract_name: &str,
        labels: &HashMap<String, String>,
        discovery: &mut serde_json::Map<String, Value>,
        stack: &mut Vec<(String, String)>,
        chain: &[AncestorStep],
        state: &mut DesiredState,
        events: &mut Vec<ResolveEvent>,
        claim_key: &Key,
    ) -> Result<Option<InstanceKey>, DomainError> {
        let pair = (contract_namespace.to_string(), contract_name.to_string());
        if stack.contains(&pair) {
            return Err(DomainError::ResolutionCycle(format!(
                "{contract_namespace}/{contract_name} re-entered on the same resolution chain"
            )));
        }

        let contract_key = Key::new(contract_namespace, "Contract", contract_name);
        let contract = match self.policy.get_object(&contract_key) {
            Some(Object::Contract(c)) => c,
            _ => {
                events.push(ResolveEvent::MissingContract {
                    claim: claim_key.clone(),
                    contract: contract_key,
                });
                return Ok(None);
            }
        };

        let context = contract.contexts.iter().find(|c| {
            c.predicate.matches(labels).unwrap_or(false)
        });
        let Some(context) = context else {
            events.push(ResolveEvent::NoMatchingContext { claim: claim_key.clone(), contract: contract_key });
            return Ok(None);
        };
        events.push(ResolveEvent::ContextChosen {
            claim: claim_key.clone(),
            contract: contract_key,
            context: context.name.clone(),
        });

        let rule_decision = self.apply_rules(contract_name, labels, claim_key, events);
        if let Some(denying_rule) = rule_decision.deny {
            events.push(ResolveEvent::Denied { claim: claim_key.clone(), rule: denying_rule });
            return Ok(None);
        }

        let service_namespace = context.allocation.service_namespace.clone();
        let service_name = context.allocation.service_name.clone();
        let service_key = Key::new(service_namespace.clone(), "Service", service_name.clone());
        let service = match self.policy.get_object(&service_key) {
            Some(Object::Service(s)) => s,
            _ => {
                events.push(ResolveEvent::MissingContract { claim: claim_key.clone(), contract: service_key });
                return Ok(None);
            }
        };

        let template_context = json!({
            "labels": labels,
            "target": {"namespace": service_namespace, "name": service_name},
            "discovery": discovery,
        });
        let mut rendered_params = HashMap::new();
        for (key, raw) in &context.parameters {
            let rendered = self.templates.render(raw, &template_context)?;
            events.push(ResolveEvent::TemplateExpanded {
                claim: claim_key.clone(),
                template: raw.clone(),
                rendered: rendered.clone(),
            });
            rendered_params.insert(key.clone(), rendered);
        }

        stack.push(pair);
        let frame = ContractFrame {
            contract_namespace: contract_namespace.to_string(),
            contract_name: contract_name.to_string(),
        };
        let root = self.resolve_service(
            service,
            &frame,
            &context.name,
            &rendered_params,
            labels,
            rule_decision.route_cluster,
            discovery,
            chain,
            stack,
            state,
            events,
            claim_key,
        )?;
        stack.pop();

        Ok(root)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_service(
        &self,
        service: &Service,
        frame: &ContractFrame,
        context_name: &str,
        parameters: &HashMap<String, String>,
        labels: &HashMap<String, String>,
        route_cluster: Option<(String, String)>,
        discovery: &mut serde_json::Map<String, Value>,
        chain: &[AncestorStep],
        stack: &mut Vec<(String, String)>,
        state: &mut DesiredState,
        events: &mut Vec<ResolveEvent>,
        claim_key: &Key,
    ) -> Result<Option<InstanceKey>, DomainError> {
        let cluster = route_cluster.unwrap_or_else(|| self.default_cluster());
        let mut component_keys: HashMap<String, InstanceKey> = HashMap::new();

        for component in &service.components {
            let mut step_chain = chain.to_vec();
            step_chain.push(AncestorStep {
                contract_namespace: frame.contract_namespace.clone(),
                contract_name: frame.contract_name.clone(),
                context_name: context_name.to_string(),
                component_name: component.name.clone(),
                cluster_namespace: cluster.0.clone(),
                cluster_name: cluster.1.clone(),
            });

            match &component.spec {
                crate::domain::model::ComponentSpec::Code { .. } => {
                    let key = InstanceKey::from_chain(&step_chain);
                    let instance = Instance {
                        key: key.clone(),
                        claim_namespace: claim_key.namespace.clone(),
                        claim_name: claim_key.name.clone(),
                        component_name: component.name.clone(),
                        cluster_namespace: cluster.0.clone(),
                        cluster_name: cluster.1.clone(),
                        parameters: parameters.clone(),
                        labels: labels.clone(),
                        spec: component.spec.clone(),
                    };
                    discovery.insert(
                        component.name.clone(),
                        json!({"instance_key": key.as_str(), "cluster": cluster.1}),
                    );
                    state.insert_instance(instance);
                    component_keys.insert(component.name.clone(), key);
                }
                crate::domain::model::ComponentSpec::ServiceRef { contract_namespace, contract_name } => {
                    let nested = self.resolve_contract(
                        contract_namespace,
                        contract_name,
                        labels,
                        discovery,
                        stack,
                        &step_chain,
                        state,
                        events,
                        claim_key,
                    )?;
                    if let Some(nested_root) = nested {
                        component_keys.insert(component.name.clone(), nested_root);
                    }
                }
            }
        }

        for component in &service.components {
            let Some(from_key) = component_keys.get(&component.name) else { continue };
            for dep_name in &component.dependencies {
                if let Some(to_key) = component_keys.get(dep_name) {
                    state.add_edge(from_key.clone(), to_key.clone());
                }
            }
        }

        Ok(self.pick_root(service, &component_keys))
    }

    /// The component nothing else in the service depends on is the
    /// sub-resolution's root; ties broken lexicographically on name.
    fn pick_root(&self, service: &Service, component_keys: &HashMap<String, InstanceKey>) -> Option<InstanceKey> {
        let depended_on: std::collections::HashSet<&str> =
            service.components.iter().flat_map(|c| c.dependencies.iter().map(|d| d.as_str())).collect();

        let mut candidates: Vec<&str> = service
            .components
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !depended_on.contains(name) && component_keys.contains_key(*name))
            .collect();
        candidates.sort();

        candidates
            .first()
            .and_then(|name| component_keys.get(*name))
            .cloned()
            .or_else(|| {
                let mut all: Vec<&String> = component_keys.keys().collect();
                all.sort();
                all.first().and_then(|name| component_keys.get(*name)).cloned()
            })
    }

    fn default_cluster(&self) -> (String, String) {
        let mut clusters: Vec<&crate::domain::model::Cluster> = self
            .policy
            .objects()
            .filter_map(|o| match o {
                Object::Cluster(c) => Some(c),
                _ => None,
            })
            .filter(|c| self.external.cluster_healthy(&Key::new(c.meta.namespace.clone(), "Cluster", c.meta.name.clone())))
            .collect();
        clusters.sort_by(|a, b| (&a.meta.namespace, &a.meta.name).cmp(&(&b.meta.namespace, &b.meta.name)));
        clusters
            .first()
            .map(|c| (c.meta.namespace.clone(), c.meta.name.clone()))
            .unwrap_or_else(|| (String::new(), String::new()))
    }

    fn apply_rules(
        &self,
        contract_name: &str,
        labels: &HashMap<String, String>,
        claim_key: &Key,
        events: &mut Vec<ResolveEvent>,
    ) -> RuleDecision {
        let rules: Vec<&Rule> = self
            .policy
            .objects()
            .filter_map(|o| match o {
                Object::Rule(r) => Some(r),
                _ => None,
            })
            .filter(|r| matches!(&r.scope, RuleScope::Contract { contract } if contract == contract_name || contract == "*"))
            .filter(|r| r.labels_match(labels))
            .collect();

        let mut decision = RuleDecision::default();
        for rule in weight_ordered(rules) {
            events.push(ResolveEvent::RuleMatched { claim: claim_key.clone(), rule: rule.meta.name.clone() });
            match &rule.effect {
                RuleEffect::Deny => {
                    decision.deny = Some(rule.meta.name.clone());
                    break;
                }
                RuleEffect::RouteCluster { cluster_namespace, cluster_name } => {
                    if decision.route_cluster.is_none() {
                        decision.route_cluster = Some((cluster_namespace.clone(), cluster_name.clone()));
                    }
                }
                RuleEffect::Allow => {}
            }
        }
        decision
    }
}

#[derive(Default)]
struct RuleDecision {
    deny: Option<String>,
    route_cluster: Option<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        AclRole, Allocation, Claim, Component, ComponentSpec, Context, Contract, ObjectMeta, Predicate, User,
    };
    use crate::ports::external_data::NullExternalData;

    struct PassthroughTemplates;
    impl TemplateEngine for PassthroughTemplates {
        fn render(&self, template: &str, _context: &Value) -> Result<String, DomainError> {
            Ok(template.to_string())
        }
    }

    fn build_policy() -> PolicyContainer {
        let mut c = PolicyContainer::new();
        c.add_object(Object::User(User {
            meta: ObjectMeta::new("p", "alice"),
            labels: HashMap::new(),
            role: AclRole::Operator,
        }))
        .unwrap();
        c.add_object(Object::Service(Service {
            meta: ObjectMeta::new("p", "web"),
            components: vec![Component {
                name: "app".into(),
                dependencies: vec![],
                spec: ComponentSpec::Code { driver_type: "chart".into(), params: HashMap::new() },
            }],
        }))
        .unwrap();
        c.add_object(Object::Contract(Contract {
            meta: ObjectMeta::new("p", "web-contract"),
            contexts: vec![Context {
                name: "default".into(),
                predicate: Predicate::Default,
                allocation: Allocation { service_namespace: "p".into(), service_name: "web".into() },
                parameters: HashMap::new(),
            }],
        }))
        .unwrap();
        c.add_object(Object::Claim(Claim {
            meta: ObjectMeta::new("p", "alice-web"),
            user_namespace: "p".into(),
            user_name: "alice".into(),
            contract_namespace: "p".into(),
            contract_name: "web-contract".into(),
            labels: HashMap::new(),
        }))
        .unwrap();
        c
    }

    #[test]
    fn resolves_a_single_code_component_claim() {
        let policy = build_policy();
        let external = NullExternalData;
        let templates = PassthroughTemplates;
        let resolver = Resolver::new(&policy, &external, &templates);
        let (state, events) = resolver.resolve().unwrap();
        assert_eq!(state.nodes.len(), 1);
        assert!(events.iter().any(|e| matches!(e, ResolveEvent::Resolved { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ResolveEvent::ContextChosen { context, .. } if context == "default")));
    }

    #[test]
    fn no_matching_context_is_recorded_not_errored() {
        let mut policy = build_policy();
        if let Some(Object::Contract(c)) = policy
            .get_object(&Key::new("p", "Contract", "web-contract"))
            .cloned()
            .as_mut()
        {
            let mut c = c.clone();
            c.contexts[0].predicate =
                Predicate::All(vec![crate::domain::model::LabelClause::Equals {
                    key: "tier".into(),
                    value: "gold".into(),
                }]);
            policy.add_object(Object::Contract(c)).unwrap();
        }
        let external = NullExternalData;
        let templates = PassthroughTemplates;
        let resolver = Resolver::new(&policy, &external, &templates);
        let (state, events) = resolver.resolve().unwrap();
        assert!(state.nodes.is_empty());
        assert!(events.iter().any(|e| matches!(e, ResolveEvent::NoMatchingContext { .. })));
    }
}
