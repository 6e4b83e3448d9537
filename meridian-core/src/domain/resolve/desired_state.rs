// meridian-core/src/domain/resolve/desired_state.rs
//
// The resolver's output: the resolved component instance graph for one
// policy generation. Modelled as an explicit node/edge map rather than real
// pointer cycles, since the graph is acyclic by construction and validated
// as such.

use std::collections::{HashMap, HashSet};

use crate::domain::resolve::instance::{Instance, InstanceKey};

#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub nodes: HashMap<InstanceKey, Instance>,
    pub edges: HashSet<(InstanceKey, InstanceKey)>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_instance(&mut self, instance: Instance) {
        self.nodes.insert(instance.key.clone(), instance);
    }

    pub fn add_edge(&mut self, from: InstanceKey, to: InstanceKey) {
        self.edges.insert((from, to));
    }

    /// Outgoing edges of `key`, i.e. instances that `key` depends on.
    pub fn outgoing(&self, key: &InstanceKey) -> Vec<&InstanceKey> {
        self.edges.iter().filter(|(from, _)| from == key).map(|(_, to)| to).collect()
    }

    pub fn incoming(&self, key: &InstanceKey) -> Vec<&InstanceKey> {
        self.edges.iter().filter(|(_, to)| to == key).map(|(from, _)| from).collect()
    }

    /// Every edge endpoint resolves to a known node.
    pub fn edges_are_well_formed(&self) -> bool {
        self.edges.iter().all(|(from, to)| self.nodes.contains_key(from) && self.nodes.contains_key(to))
    }
}
