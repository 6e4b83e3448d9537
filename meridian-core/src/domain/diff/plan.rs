// meridian-core/src/domain/diff/plan.rs
//
// The action plan: an ordered sequence of lifecycle actions
// produced by diffing two `DesiredState`s. `as_text` is a stable,
// deterministic rendering used for noop previews.

use chrono::{DateTime, Utc};

use crate::domain::resolve::{Instance, InstanceKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create(Instance),
    Update(Instance),
    Delete(InstanceKey),
    AttachDependency { from: InstanceKey, to: InstanceKey },
    DetachDependency { from: InstanceKey, to: InstanceKey },
    UpdateComponentTimes { instance: InstanceKey, first_seen: DateTime<Utc>, last_seen: DateTime<Utc> },
}

impl Action {
    fn text_line(&self) -> String {
        match self {
            Action::Create(i) => format!("create {}", i.key),
            Action::Update(i) => format!("update {}", i.key),
            Action::Delete(k) => format!("delete {k}"),
            Action::AttachDependency { from, to } => format!("attach {from} -> {to}"),
            Action::DetachDependency { from, to } => format!("detach {from} -> {to}"),
            Action::UpdateComponentTimes { instance, first_seen, last_seen } => {
                format!("times {instance} first={first_seen} last={last_seen}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPlan {
    pub actions: Vec<Action>,
}

impl ActionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Stable, deterministic rendering: one line per action, in plan order.
    pub fn as_text(&self) -> String {
        self.actions.iter().map(Action::text_line).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_text_is_stable_across_identical_plans() {
        let mut a = ActionPlan::new();
        a.push(Action::Delete(InstanceKey("x".into())));
        let mut b = ActionPlan::new();
        b.push(Action::Delete(InstanceKey("x".into())));
        assert_eq!(a.as_text(), b.as_text());
    }

    #[test]
    fn empty_plan_renders_empty_text() {
        assert_eq!(ActionPlan::new().as_text(), "");
    }
}
