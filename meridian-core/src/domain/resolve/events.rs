// meridian-core/src/domain/resolve/events.rs
//
// The resolver's event log: every claim that resolved to zero instances
// records *why* here rather than failing silently.

use crate::domain::model::Key;
use crate::domain::resolve::instance::InstanceKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    Resolved { claim: Key, root: InstanceKey },
    ContextChosen { claim: Key, contract: Key, context: String },
    RuleMatched { claim: Key, rule: String },
    TemplateExpanded { claim: Key, template: String, rendered: String },
    NoMatchingContext { claim: Key, contract: Key },
    Denied { claim: Key, rule: String },
    MissingUser { claim: Key, user: Key },
    MissingContract { claim: Key, contract: Key },
}
