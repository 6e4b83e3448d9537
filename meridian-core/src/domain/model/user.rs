// meridian-core/src/domain/model/user.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::meta::ObjectMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclRole {
    Operator,
    DomainAdmin,
}

/// Identity with labels and ACL role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub role: AclRole,
}

impl User {
    pub fn is_domain_admin(&self) -> bool {
        matches!(self.role, AclRole::DomainAdmin)
    }
}
