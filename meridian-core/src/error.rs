// meridian-core/src/error.rs

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::store::StoreError;

#[derive(Error, Debug, Diagnostic)]
pub enum MeridianError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}
