// meridian-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    #[error("file system error: {0}")]
    #[diagnostic(code(meridian::infra::io), help("check file permissions or path validity"))]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    #[diagnostic(code(meridian::infra::yaml), help("check YAML syntax (indentation, types)"))]
    YamlError(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    #[diagnostic(code(meridian::infra::config))]
    ConfigError(String),

    #[error("configuration not found at '{0}'")]
    #[diagnostic(code(meridian::infra::config_missing))]
    ConfigNotFound(String),

    #[error("template rendering error: {0}")]
    #[diagnostic(code(meridian::infra::template), help("check your {{ ... }} expression syntax"))]
    TemplateError(#[from] minijinja::Error),
}
