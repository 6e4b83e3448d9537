// meridian-core/src/domain/diff/differ.rs
//
// The diff + action planner. Given `(desired_new, desired_prev)` both
// keyed by instance key, produces a dependency-ordered `ActionPlan`.
// Topological order is computed on the union graph; ties are broken
// lexicographically on instance key (both already guaranteed by
// `GraphSolver`).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::diff::plan::{Action, ActionPlan};
use crate::domain::error::DomainError;
use crate::domain::graph::GraphSolver;
use crate::domain::resolve::{DesiredState, InstanceKey};

#[derive(Debug, Clone, Copy)]
pub struct ComponentTimes {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Inverts `state`'s edges (`from depends on to`) into a precedence graph
/// (`to must precede from`) suitable for `GraphSolver`.
fn precedence_edges(state: &DesiredState) -> HashMap<InstanceKey, Vec<InstanceKey>> {
    GraphSolver::edges_from_pairs(state.edges.iter().map(|(from, to)| (to.clone(), from.clone())))
}

pub fn diff(
    desired_new: &DesiredState,
    desired_prev: &DesiredState,
    prev_times: &HashMap<InstanceKey, ComponentTimes>,
    now: DateTime<Utc>,
) -> Result<ActionPlan, DomainError> {
    let mut plan = ActionPlan::new();

    let new_keys: HashSet<&InstanceKey> = desired_new.nodes.keys().collect();
    let prev_keys: HashSet<&InstanceKey> = desired_prev.nodes.keys().collect();

    let union_nodes: Vec<InstanceKey> = {
        let mut all: Vec<InstanceKey> = new_keys.union(&prev_keys).map(|k| (*k).clone()).collect();
        all.sort();
        all
    };
    let mut union_edges: HashMap<InstanceKey, Vec<InstanceKey>> = HashMap::new();
    for (key, deps) in precedence_edges(desired_new).into_iter().chain(precedence_edges(desired_prev)) {
        union_edges.entry(key).or_default().extend(deps);
    }
    for deps in union_edges.values_mut() {
        deps.sort();
        deps.dedup();
    }

    let order = GraphSolver::flat_order(&union_nodes, &union_edges)?;

    // Creates, in dependency order: `Create(B)` precedes `Create(A)` when `A`
    // depends on `B`, satisfied because the precedence graph orders
    // dependencies before dependents.
    for key in &order {
        if new_keys.contains(key) && !prev_keys.contains(key) {
            let instance = desired_new.nodes.get(key).expect("key came from new_keys").clone();
            plan.push(Action::Create(instance));
            for to in desired_new.outgoing(key) {
                plan.push(Action::AttachDependency { from: key.clone(), to: to.clone() });
            }
        }
    }

    // Updates: present in both, content or edge set differs.
    for key in &order {
        if !(new_keys.contains(key) && prev_keys.contains(key)) {
            continue;
        }
        let new_instance = &desired_new.nodes[key];
        let prev_instance = &desired_prev.nodes[key];

        let new_out: HashSet<&InstanceKey> = desired_new.outgoing(key).into_iter().collect();
        let prev_out: HashSet<&InstanceKey> = desired_prev.outgoing(key).into_iter().collect();

        let content_changed = new_instance.parameters != prev_instance.parameters
            || new_instance.spec != prev_instance.spec
            || new_instance.cluster_namespace != prev_instance.cluster_namespace
            || new_instance.cluster_name != prev_instance.cluster_name;
        let edges_changed = new_out != prev_out;

        if content_changed || edges_changed {
            plan.push(Action::Update(new_instance.clone()));
        }
        if edges_changed {
            for to in new_out.difference(&prev_out) {
                plan.push(Action::AttachDependency { from: key.clone(), to: (*to).clone() });
            }
            for to in prev_out.difference(&new_out) {
                plan.push(Action::DetachDependency { from: key.clone(), to: (*to).clone() });
            }
        }
    }

    // Deletes, in reverse topological order of prev.
    let prev_nodes: Vec<InstanceKey> = desired_prev.nodes.keys().cloned().collect();
    let prev_order = GraphSolver::flat_order(&prev_nodes, &precedence_edges(desired_prev))?;
    for key in prev_order.into_iter().rev() {
        if prev_keys.contains(&key) && !new_keys.contains(&key) {
            for to in desired_prev.outgoing(&key) {
                plan.push(Action::DetachDependency { from: key.clone(), to: to.clone() });
            }
            plan.push(Action::Delete(key));
        }
    }

    // Component-time bookkeeping for every surviving instance.
    for key in &order {
        if !new_keys.contains(key) {
            continue;
        }
        let first_seen = prev_times.get(key).map(|t| t.first_seen).unwrap_or(now);
        plan.push(Action::UpdateComponentTimes { instance: key.clone(), first_seen, last_seen: now });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ComponentSpec;
    use crate::domain::resolve::Instance;
    use std::collections::HashMap as Map;

    fn instance(key: &str) -> Instance {
        Instance {
            key: InstanceKey(key.to_string()),
            claim_namespace: "p".into(),
            claim_name: "claim".into(),
            component_name: "app".into(),
            cluster_namespace: "p".into(),
            cluster_name: "eu-1".into(),
            parameters: Map::new(),
            labels: Map::new(),
            spec: ComponentSpec::Code { driver_type: "chart".into(), params: Map::new() },
        }
    }

    #[test]
    fn new_instance_is_a_create() {
        let mut new_state = DesiredState::new();
        new_state.insert_instance(instance("a"));
        let prev_state = DesiredState::new();
        let plan = diff(&new_state, &prev_state, &Map::new(), Utc::now()).unwrap();
        assert!(matches!(plan.actions[0], Action::Create(_)));
    }

    #[test]
    fn removed_instance_is_a_delete() {
        let new_state = DesiredState::new();
        let mut prev_state = DesiredState::new();
        prev_state.insert_instance(instance("a"));
        let plan = diff(&new_state, &prev_state, &Map::new(), Utc::now()).unwrap();
        assert!(plan.actions.iter().any(|a| matches!(a, Action::Delete(_))));
    }

    #[test]
    fn dependency_creates_before_dependent() {
        let mut new_state = DesiredState::new();
        new_state.insert_instance(instance("a"));
        new_state.insert_instance(instance("b"));
        new_state.add_edge(InstanceKey("a".into()), InstanceKey("b".into()));
        let prev_state = DesiredState::new();
        let plan = diff(&new_state, &prev_state, &Map::new(), Utc::now()).unwrap();

        let create_positions: Vec<&str> = plan
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Create(i) => Some(i.key.as_str()),
                _ => None,
            })
            .collect();
        let pos_b = create_positions.iter().position(|k| *k == "b").unwrap();
        let pos_a = create_positions.iter().position(|k| *k == "a").unwrap();
        assert!(pos_b < pos_a);
    }

    #[test]
    fn unchanged_instance_still_gets_component_times() {
        let mut state = DesiredState::new();
        state.insert_instance(instance("a"));
        let plan = diff(&state, &state, &Map::new(), Utc::now()).unwrap();
        assert!(plan.actions.iter().any(|a| matches!(a, Action::UpdateComponentTimes { .. })));
        assert!(!plan.actions.iter().any(|a| matches!(a, Action::Create(_) | Action::Update(_))));
    }
}
