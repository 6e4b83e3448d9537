// meridian-core/src/domain/model/claim.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::meta::ObjectMeta;

/// A consumer-side request: a user demanding an instantiation of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub user_namespace: String,
    pub user_name: String,
    pub contract_namespace: String,
    pub contract_name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}
