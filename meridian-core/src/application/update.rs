// meridian-core/src/application/update.rs
//
// The policy update use case: the only path that mutates the live policy
// and republishes a desired state. A single mutex serializes
// compose-validate-resolve-diff-persist-publish so two concurrent submits
// never race past each other's validation pass, the same "one critical
// section owns the whole run" shape as a build-pipeline orchestrator
// generalized here to the submit/delete/get use cases.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{info, instrument};

use crate::domain::diff::{self, Action, ActionPlan, ComponentTimes};
use crate::domain::error::DomainError;
use crate::domain::model::{Key, Object};
use crate::domain::policy::{PolicyContainer, SharedPolicyContainer};
use crate::domain::registry::Catalog;
use crate::domain::resolve::{DesiredState, InstanceKey, ResolveEvent, Resolver};
use crate::domain::store::{GenerationalStore, SaveOptions};
use crate::ports::external_data::ExternalDataProvider;
use crate::ports::store::Store;
use crate::ports::template::TemplateEngine;

#[derive(Debug, Clone)]
pub struct PolicyUpdateResult {
    pub object: Object,
    pub plan: ActionPlan,
    pub events: Vec<ResolveEvent>,
}

struct ResolutionState {
    desired: DesiredState,
    times: HashMap<InstanceKey, ComponentTimes>,
}

impl Default for ResolutionState {
    fn default() -> Self {
        Self { desired: DesiredState::new(), times: HashMap::new() }
    }
}

pub struct PolicyService<'s> {
    store: &'s dyn Store,
    catalog: Catalog,
    container: SharedPolicyContainer,
    external: &'s dyn ExternalDataProvider,
    templates: &'s dyn TemplateEngine,
    update_lock: Mutex<()>,
    resolution: Mutex<ResolutionState>,
    publish: watch::Sender<()>,
}

impl<'s> PolicyService<'s> {
    pub fn new(store: &'s dyn Store, external: &'s dyn ExternalDataProvider, templates: &'s dyn TemplateEngine) -> Self {
        let (publish, _) = watch::channel(());
        Self {
            store,
            catalog: Catalog::standard(),
            container: SharedPolicyContainer::new(PolicyContainer::new()),
            external,
            templates,
            update_lock: Mutex::new(()),
            resolution: Mutex::new(ResolutionState::default()),
            publish,
        }
    }

    /// A receiver the enforcement loop can `.changed().await` on; every
    /// successful submit/delete notifies it (coalesced -- a receiver that
    /// misses one notification still sees the next).
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.publish.subscribe()
    }

    #[instrument(skip(self, object, user_key), fields(kind = object.kind(), namespace = object.namespace(), name = object.name()))]
    pub async fn submit(&self, object: Object, user_key: &Key) -> Result<PolicyUpdateResult, DomainError> {
        let _guard = self.update_lock.lock().await;

        let snapshot = self.container.snapshot().await;
        // Bootstrapping: an empty container has no `User` object to check the
        // submitter against, so the very first submit (normally a domain-admin
        // `User`) is let through unconditionally.
        if !snapshot.is_empty() {
            let view = snapshot.view(user_key)?;
            if !view.can_manage(&object) {
                return Err(DomainError::AclDenied { user: user_key.to_string(), object: object.object_ref() });
            }
        }

        let gs = GenerationalStore::new(self.store, &self.catalog);
        let saved = gs.save(object, SaveOptions::default()).await?;

        let saved_for_container = saved.clone();
        let new_container = self
            .container
            .update(move |c| c.add_object(saved_for_container))
            .await?;

        self.publish_and_plan(&new_container, saved).await
    }

    #[instrument(skip(self, user_key), fields(namespace = %key.namespace, kind = key.kind, name = %key.name))]
    pub async fn delete(&self, key: &Key, user_key: &Key) -> Result<PolicyUpdateResult, DomainError> {
        let _guard = self.update_lock.lock().await;

        let snapshot = self.container.snapshot().await;
        let existing = snapshot
            .get_object(key)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(crate::domain::model::ObjectRef::new(key, 0)))?;

        let view = snapshot.view(user_key)?;
        if !view.can_manage(&existing) {
            return Err(DomainError::AclDenied { user: user_key.to_string(), object: existing.object_ref() });
        }

        let key = key.clone();
        let new_container = self.container.update(move |c| Ok(c.remove_object(&key))).await?;

        self.publish_and_plan(&new_container, existing).await
    }

    pub async fn get_policy(&self, key: &Key) -> Option<Object> {
        self.container.snapshot().await.get_object(key).cloned()
    }

    pub async fn get_desired_state(&self) -> DesiredState {
        self.resolution.lock().await.desired.clone()
    }

    async fn publish_and_plan(
        &self,
        container: &PolicyContainer,
        object: Object,
    ) -> Result<PolicyUpdateResult, DomainError> {
        let resolver = Resolver::new(container, self.external, self.templates);
        let (desired_new, events) = resolver.resolve()?;

        let mut resolution = self.resolution.lock().await;
        let now = Utc::now();
        let plan = diff::diff(&desired_new, &resolution.desired, &resolution.times, now)?;

        for action in &plan.actions {
            if let Action::UpdateComponentTimes { instance, first_seen, last_seen } = action {
                resolution.times.insert(instance.clone(), ComponentTimes { first_seen: *first_seen, last_seen: *last_seen });
            }
        }
        resolution.desired = desired_new;
        drop(resolution);

        info!(actions = plan.actions.len(), "policy update resolved and planned");
        let _ = self.publish.send(());

        Ok(PolicyUpdateResult { object, plan, events })
    }
}
