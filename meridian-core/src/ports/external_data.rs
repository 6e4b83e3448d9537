// meridian-core/src/ports/external_data.rs
//
// External data the resolver needs but does not own: user labels (which may be
// richer than what's stored on the `User` object, e.g. SSO group membership),
// and cluster health used to pick among otherwise-equal cluster candidates.

use std::collections::HashMap;

use crate::domain::model::Key;

pub trait ExternalDataProvider: Send + Sync {
    /// Additional labels for a user, merged on top of the `User` object's own
    /// labels (external data wins on key collision).
    fn user_labels(&self, user_namespace: &str, user_name: &str) -> HashMap<String, String>;

    /// Whether a cluster is currently healthy enough to receive new instances.
    /// Defaults to `true` when the provider has no opinion.
    fn cluster_healthy(&self, cluster_key: &Key) -> bool;
}

/// A provider with no external signal: user labels come solely from the
/// stored `User` object, and every cluster is considered healthy. Useful for
/// tests and for the CLI harness.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullExternalData;

impl ExternalDataProvider for NullExternalData {
    fn user_labels(&self, _user_namespace: &str, _user_name: &str) -> HashMap<String, String> {
        HashMap::new()
    }

    fn cluster_healthy(&self, _cluster_key: &Key) -> bool {
        true
    }
}
