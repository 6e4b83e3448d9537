// meridian-core/src/ports/driver.rs
//
// Cluster driver plugin contract. Real drivers that talk to orchestrators
// are out of scope for this core; only the trait and an in-memory test/demo
// driver (`infrastructure::store` module doesn't host it — see
// `application::enforcement::test_support` for the latter) live here.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::domain::resolve::instance::{Instance, InstanceKey};

#[derive(Error, Debug, Diagnostic)]
pub enum DriverError {
    #[error("driver call cancelled (deadline exceeded)")]
    #[diagnostic(code(meridian::driver::cancelled))]
    Cancelled,

    #[error("transient driver error: {0}")]
    #[diagnostic(code(meridian::driver::transient))]
    Transient(String),

    #[error("fatal driver error: {0}")]
    #[diagnostic(code(meridian::driver::fatal))]
    Fatal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

/// What `Apply` is asked to do to an instance; a thin mirror of
/// `domain::diff::plan::Action` that drops the plan-ordering metadata a driver
/// has no business seeing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOp {
    Create,
    Update,
    Delete,
}

#[async_trait]
pub trait ClusterDriver: Send + Sync {
    fn driver_type(&self) -> &str;
    async fn validate(&self) -> Result<(), DriverError>;
    async fn apply(&self, op: DriverOp, instance: &Instance) -> Result<ActionStatus, DriverError>;
    async fn status(&self, instance_key: &InstanceKey) -> Result<ActionStatus, DriverError>;
    async fn endpoints(&self, instance_key: &InstanceKey) -> Result<Vec<String>, DriverError>;
}
