// meridian-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::model::ObjectRef;

/// A single offending object surfaced by a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offender {
    pub object: ObjectRef,
    pub reason: String,
}

impl std::fmt::Display for Offender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.object, self.reason)
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("policy failed validation ({} offender(s))", .offenders.len())]
    #[diagnostic(
        code(meridian::domain::validation),
        help("inspect `offenders` for the precise objects and reasons")
    )]
    ValidationError { offenders: Vec<Offender> },

    #[error("circular dependency detected: {0}")]
    #[diagnostic(code(meridian::domain::cycle))]
    ResolutionCycle(String),

    #[error("no context in contract '{0}' matched the claim's labels")]
    #[diagnostic(code(meridian::domain::no_match))]
    NoMatchingContext(String),

    #[error("claim denied by rule '{rule}' for object {object}")]
    #[diagnostic(code(meridian::domain::denied))]
    Denied { object: ObjectRef, rule: String },

    #[error("template '{template}' left unresolved variable '{variable}'")]
    #[diagnostic(code(meridian::domain::unresolved_template))]
    UnresolvedTemplate { template: String, variable: String },

    #[error("object {0} not found")]
    #[diagnostic(code(meridian::domain::not_found))]
    NotFound(ObjectRef),

    #[error("object {existing} already exists at a different generation than the incoming {incoming}")]
    #[diagnostic(
        code(meridian::domain::conflict),
        help("re-add with the current generation to replay, or bump it to supersede")
    )]
    Conflict { existing: ObjectRef, incoming: ObjectRef },

    #[error("user '{user}' is not permitted to manage object {object}")]
    #[diagnostic(code(meridian::domain::acl_denied))]
    AclDenied { user: String, object: ObjectRef },

    #[error("result shape mismatch: expected {expected}, got {actual}")]
    #[diagnostic(code(meridian::domain::shape_mismatch))]
    ShapeMismatch { expected: String, actual: String },

    #[error("unknown object kind '{0}'")]
    #[diagnostic(code(meridian::domain::unknown_kind))]
    UnknownKind(String),
}
