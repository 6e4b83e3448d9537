// meridian-core/src/ports/template.rs
//
// The parameter-templating contract the resolver renders through. The
// concrete implementation (`infrastructure::compiler::jinja`) is a
// thin minijinja wrapper; the core only depends on this trait so the
// resolver's tests can swap in a trivial stub.

use serde_json::Value;

use crate::domain::error::DomainError;

pub trait TemplateEngine: Send + Sync {
    /// Renders `template` against `context`. Must fail with
    /// `DomainError::UnresolvedTemplate` (not a generic error) when a
    /// referenced variable is absent from `context` -- the resolver relies
    /// on that specific variant to report which variable was missing.
    fn render(&self, template: &str, context: &Value) -> Result<String, DomainError>;
}
