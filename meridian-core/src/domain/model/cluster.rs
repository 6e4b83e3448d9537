// meridian-core/src/domain/model/cluster.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::meta::ObjectMeta;

/// A deployment target identified by driver type and opaque config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub driver_type: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}
