// meridian-core/src/domain/policy/container.rs
//
// The policy container: the in-process working copy of every known
// object, indexed by `(namespace, kind, name)`. Mutation on a shared
// container goes through a reader-writer lock held for the full duration of
// a read or update; the container is also cloneable (deep copy) since update
// handlers mutate a copy then atomically swap it in via the caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::error::DomainError;
use crate::domain::model::{Key, Object, ObjectRef};
use crate::domain::policy::validate::validate_policy;
use crate::domain::policy::view::ScopedView;

#[derive(Debug, Clone, Default)]
pub struct PolicyContainer {
    objects: HashMap<Key, Object>,
}

impl PolicyContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `object`. Fails if an object already exists at the same key
    /// with a *different* generation than `object`'s (replaying the current
    /// generation is allowed and is a no-op).
    pub fn add_object(&mut self, object: Object) -> Result<(), DomainError> {
        let key = object.key();
        if let Some(existing) = self.objects.get(&key) {
            if existing.generation() != object.generation() {
                return Err(DomainError::Conflict {
                    existing: existing.object_ref(),
                    incoming: object.object_ref(),
                });
            }
        }
        self.objects.insert(key, object);
        Ok(())
    }

    /// Idempotent removal by `(ns, kind, name)`.
    pub fn remove_object(&mut self, key: &Key) {
        self.objects.remove(key);
    }

    pub fn get_object(&self, key: &Key) -> Option<&Object> {
        self.objects.get(key)
    }

    pub fn get_by_ref(&self, object_ref: &ObjectRef) -> Option<&Object> {
        self.objects.get(&object_ref.key())
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Evaluates ACL rules to build a check-only view scoped to `user`.
    pub fn view(&self, user_key: &Key) -> Result<ScopedView<'_>, DomainError> {
        let user = match self.objects.get(user_key) {
            Some(Object::User(u)) => u,
            Some(_) => return Err(DomainError::UnknownKind(format!("{user_key} is not a User"))),
            None => return Err(DomainError::NotFound(ObjectRef::new(user_key, 0))),
        };
        Ok(ScopedView::new(self, user))
    }

    /// Referential integrity, rule-weight uniqueness, and acyclic intra-service
    /// dependencies. Collects every offender rather than failing on the first.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_policy(self)
    }
}

/// A container shared across the update pipeline: readers/writers serialize
/// through one lock; updates clone-mutate-validate-swap rather than mutating
/// in place under the lock, so a failed update never leaves a half-written
/// container visible to readers.
#[derive(Clone, Default)]
pub struct SharedPolicyContainer {
    inner: Arc<RwLock<PolicyContainer>>,
}

impl SharedPolicyContainer {
    pub fn new(container: PolicyContainer) -> Self {
        Self { inner: Arc::new(RwLock::new(container)) }
    }

    pub async fn snapshot(&self) -> PolicyContainer {
        self.inner.read().await.clone()
    }

    /// Applies `mutate` to a clone of the current container; if the mutated
    /// clone validates, it is swapped in atomically and returned.
    pub async fn update<F>(&self, mutate: F) -> Result<PolicyContainer, DomainError>
    where
        F: FnOnce(&mut PolicyContainer) -> Result<(), DomainError>,
    {
        let mut guard = self.inner.write().await;
        let mut candidate = guard.clone();
        mutate(&mut candidate)?;
        candidate.validate()?;
        *guard = candidate.clone();
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ObjectMeta, Service};

    fn service(name: &str) -> Object {
        Object::Service(Service { meta: ObjectMeta::new("p", name), components: vec![] })
    }

    #[test]
    fn add_object_replay_of_same_generation_is_ok() {
        let mut c = PolicyContainer::new();
        c.add_object(service("kafka")).unwrap();
        c.add_object(service("kafka")).unwrap();
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn add_object_rejects_conflicting_generation() {
        let mut c = PolicyContainer::new();
        c.add_object(service("kafka")).unwrap();
        let mut bumped = service("kafka");
        bumped.set_generation(5);
        let err = c.add_object(bumped).unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn remove_object_is_idempotent() {
        let mut c = PolicyContainer::new();
        c.add_object(service("kafka")).unwrap();
        let key = Key::new("p", "Service", "kafka");
        c.remove_object(&key);
        c.remove_object(&key);
        assert!(c.is_empty());
    }
}
