// meridian-core/src/domain/model/service.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::meta::ObjectMeta;

/// Declares a set of components with dependencies between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub components: Vec<Component>,
}

/// One node inside a service: either a code-hosting leaf, or a composition edge
/// into another service (which re-enters contract resolution for a sub-claim).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub spec: ComponentSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentSpec {
    /// Hosts code: an opaque params map interpreted by the named driver.
    Code {
        driver_type: String,
        #[serde(default)]
        params: HashMap<String, serde_json::Value>,
    },
    /// Composition: instantiate another service by re-entering a contract.
    ServiceRef {
        contract_namespace: String,
        contract_name: String,
    },
}

impl Service {
    /// Component-dependency cycle check, scoped to this single service: no
    /// component-dependency cycle may exist within one service.
    pub fn has_dependency_cycle(&self) -> bool {
        let by_name: HashMap<&str, &Component> =
            self.components.iter().map(|c| (c.name.as_str(), c)).collect();

        let mut state: HashMap<&str, u8> = HashMap::new(); // 0=unvisited,1=visiting,2=done
        for c in &self.components {
            if Self::visit(c.name.as_str(), &by_name, &mut state) {
                return true;
            }
        }
        false
    }

    fn visit<'a>(
        name: &'a str,
        by_name: &HashMap<&'a str, &'a Component>,
        state: &mut HashMap<&'a str, u8>,
    ) -> bool {
        match state.get(name) {
            Some(1) => return true,
            Some(2) => return false,
            _ => {}
        }
        state.insert(name, 1);
        if let Some(c) = by_name.get(name) {
            for dep in &c.dependencies {
                if Self::visit(dep.as_str(), by_name, state) {
                    return true;
                }
            }
        }
        state.insert(name, 2);
        false
    }
}
