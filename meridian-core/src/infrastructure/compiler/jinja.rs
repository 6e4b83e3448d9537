// meridian-core/src/infrastructure/compiler/jinja.rs
//
// The minijinja-backed `TemplateEngine`, rendering the `{{ discovery.* }}` /
// `{{ target.namespace }}` style expressions a contract context's parameter
// map may contain. Undefined variables are a hard error
// (`UndefinedBehavior::Strict`) rather than silently rendering empty, since
// the resolver must be able to tell `UnresolvedTemplate` apart from a
// template that legitimately renders to an empty string.

use minijinja::{Environment, UndefinedBehavior};

use crate::domain::error::DomainError;
use crate::ports::template::TemplateEngine;

pub struct JinjaTemplateEngine<'a> {
    env: Environment<'a>,
}

impl<'a> JinjaTemplateEngine<'a> {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }
}

impl<'a> Default for JinjaTemplateEngine<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TemplateEngine for JinjaTemplateEngine<'a> {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, DomainError> {
        self.env.render_str(template, context).map_err(|e| {
            let variable = e
                .detail()
                .map(|d| d.to_string())
                .unwrap_or_else(|| e.to_string());
            DomainError::UnresolvedTemplate { template: template.to_string(), variable }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_known_variables() {
        let engine = JinjaTemplateEngine::new();
        let ctx = json!({"target": {"namespace": "platform"}});
        let out = engine.render("{{ target.namespace }}", &ctx).unwrap();
        assert_eq!(out, "platform");
    }

    #[test]
    fn unresolved_variable_is_reported() {
        let engine = JinjaTemplateEngine::new();
        let ctx = json!({});
        let err = engine.render("{{ discovery.host }}", &ctx).unwrap_err();
        assert!(matches!(err, DomainError::UnresolvedTemplate { .. }));
    }

    #[test]
    fn literal_text_without_expressions_passes_through() {
        let engine = JinjaTemplateEngine::new();
        let out = engine.render("static-value", &json!({})).unwrap();
        assert_eq!(out, "static-value");
    }
}
