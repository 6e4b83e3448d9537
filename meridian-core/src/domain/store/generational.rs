// meridian-core/src/domain/store/generational.rs
//
// The generational store: the only way callers write or read versioned
// objects. Wraps a `ports::Store` through `Txn`, maintaining the `lastgen`
// and `listgen` indexes declared in `index.rs` inside the same transaction
// as the object write.

use crate::domain::codec;
use crate::domain::error::DomainError;
use crate::domain::model::{Generation, Key, Object};
use crate::domain::registry::Catalog;
use crate::domain::store::index::{self, ListGenEntry};
use crate::domain::store::txn::{transact_retry, Txn, DEFAULT_MAX_RETRIES};
use crate::ports::store::{Store, StoreError};

fn object_key(namespace: &str, kind: &str, name: &str, generation: Generation) -> String {
    format!("/object/{namespace}/{kind}/{name}@{generation}")
}

fn object_prefix(namespace: &str, kind: &str) -> String {
    format!("/object/{namespace}/{kind}/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Generation is assigned by the store: `lastgen + 1`, or `lastgen`
    /// unchanged if the content is identical to what's already stored.
    #[default]
    Default,
    /// The caller-supplied generation is authoritative; any existing object
    /// at that generation (and its index entries) is fully replaced.
    ReplaceOrForceGen,
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    pub mode: SaveMode,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { mode: SaveMode::Default }
    }
}

pub enum FindQuery<'a> {
    /// `/object/<ns>/<kind>/` prefix scan, newest generation of each name.
    ByKeyPrefix { namespace: &'a str, kind: &'static str },
    /// A single object at an exact generation (`0` means "via lastgen").
    ByKeyGeneration { namespace: &'a str, kind: &'static str, name: &'a str, generation: Generation },
    /// Index lookup by an indexed field's value.
    ByField { namespace: &'a str, kind: &'static str, field: &'a str, value: &'a str, pick: FieldPick },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPick {
    All,
    First,
    Last,
}

pub enum FindResult {
    One(Option<Object>),
    Many(Vec<Object>),
}

pub struct GenerationalStore<'s> {
    store: &'s dyn Store,
    catalog: &'s Catalog,
}

impl<'s> GenerationalStore<'s> {
    pub fn new(store: &'s dyn Store, catalog: &'s Catalog) -> Self {
        Self { store, catalog }
    }

    pub async fn save(&self, object: Object, opts: SaveOptions) -> Result<Object, DomainError> {
        let kind = object.kind();
        let type_info = self
            .catalog
            .lookup(kind)
            .ok_or_else(|| DomainError::UnknownKind(kind.to_string()))?;

        if !type_info.versioned {
            return self.save_unversioned(object).await;
        }

        match opts.mode {
            SaveMode::Default => self.save_default(object).await,
            SaveMode::ReplaceOrForceGen => self.save_replace_or_force_gen(object).await,
        }
    }

    async fn save_unversioned(&self, mut object: Object) -> Result<Object, DomainError> {
        object.set_generation(0);
        let namespace = object.namespace().to_string();
        let kind = object.kind();
        let name = object.name().to_string();
        let bytes = codec::marshal(&object)?;

        transact_retry(DEFAULT_MAX_RETRIES, || async {
            let mut txn = Txn::new(self.store);
            txn.put(object_key(&namespace, kind, &name, 0), bytes.clone());
            txn.commit().await
        })
        .await
        .map_err(store_err)?;

        Ok(object)
    }

    async fn save_default(&self, object: Object) -> Result<Object, DomainError> {
        let namespace = object.namespace().to_string();
        let kind = object.kind();
        let name = object.name().to_string();

        transact_retry(DEFAULT_MAX_RETRIES, || {
            let namespace = namespace.clone();
            let object = object.clone();
            let name = name.clone();
            async move {
                let mut txn = Txn::new(self.store);
                let last_gen = index::read_last_gen(&mut txn, &namespace, kind, &name).await?;

                let (final_object, r#gen, unchanged) = match last_gen {
                    None => {
                        let mut o = object.clone();
                        o.set_generation(1);
                        (o, 1u64, false)
                    }
                    Some(prev_gen) => {
                        let prev_bytes = txn
                            .get(&object_key(&namespace, kind, &name, prev_gen))
                            .await?;
                        let prev = prev_bytes
                            .and_then(|b| crate::domain::codec::unmarshal(&b).ok());
                        let same = prev
                            .as_ref()
                            .map(|p| crate::domain::codec::content_equal(p, &object))
                            .unwrap_or(false);
                        if same {
                            let mut o = object.clone();
                            o.set_generation(prev_gen);
                            (o, prev_gen, true)
                        } else {
                            let mut o = object.clone();
                            o.set_generation(prev_gen + 1);
                            (o, prev_gen + 1, false)
                        }
                    }
                };

                if unchanged {
                    return Ok(final_object);
                }

                let bytes = crate::domain::codec::marshal(&final_object)
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                txn.put(object_key(&namespace, kind, &name, r#gen), bytes);
                index::write_last_gen(&mut txn, &namespace, kind, &name, r#gen);
                index::reindex(&mut txn, self.catalog, &namespace, kind, &name, Some(&final_object), r#gen)
                    .await?;
                txn.commit().await?;
                Ok(final_object)
            }
        })
        .await
        .map_err(store_err)
    }

    async fn save_replace_or_force_gen(&self, object: Object) -> Result<Object, DomainError> {
        let namespace = object.namespace().to_string();
        let kind = object.kind();
        let name = object.name().to_string();
        let r#gen = object.generation();

        transact_retry(DEFAULT_MAX_RETRIES, || {
            let namespace = namespace.clone();
            let object = object.clone();
            let name = name.clone();
            async move {
                let mut txn = Txn::new(self.store);
                // Fully remove any prior indexing for this name (stale listgen
                // entries included) before the authoritative write lands.
                index::reindex(&mut txn, self.catalog, &namespace, kind, &name, None, r#gen).await?;

                let bytes = crate::domain::codec::marshal(&object)
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                txn.put(object_key(&namespace, kind, &name, r#gen), bytes);

                let last_gen = index::read_last_gen(&mut txn, &namespace, kind, &name).await?;
                if last_gen.map(|lg| r#gen >= lg).unwrap_or(true) {
                    index::write_last_gen(&mut txn, &namespace, kind, &name, r#gen);
                }
                index::reindex(&mut txn, self.catalog, &namespace, kind, &name, Some(&object), r#gen)
                    .await?;
                txn.commit().await?;
                Ok(object)
            }
        })
        .await
        .map_err(store_err)
    }

    pub async fn find(&self, query: FindQuery<'_>) -> Result<FindResult, DomainError> {
        match query {
            FindQuery::ByKeyPrefix { namespace, kind } => {
                let mut txn = Txn::new(self.store);
                let prefix = object_prefix(namespace, kind);
                let entries = txn.range(&prefix).await.map_err(store_err)?;

                // Keep only the highest generation per name.
                let mut by_name: std::collections::HashMap<String, (Generation, Object)> =
                    std::collections::HashMap::new();
                for (key, bytes) in entries {
                    let Some((name, r#gen)) = parse_object_key(&key) else { continue };
                    let obj = crate::domain::codec::unmarshal(&bytes)?;
                    by_name
                        .entry(name)
                        .and_modify(|existing| {
                            if r#gen > existing.0 {
                                *existing = (r#gen, obj.clone());
                            }
                        })
                        .or_insert((r#gen, obj));
                }
                let mut objects: Vec<Object> = by_name.into_values().map(|(_, o)| o).collect();
                objects.sort_by(|a, b| a.name().cmp(b.name()));
                Ok(FindResult::Many(objects))
            }
            FindQuery::ByKeyGeneration { namespace, kind, name, generation } => {
                let mut txn = Txn::new(self.store);
                let r#gen = if generation == 0 {
                    match index::read_last_gen(&mut txn, namespace, kind, name).await.map_err(store_err)? {
                        Some(g) => g,
                        None => return Ok(FindResult::One(None)),
                    }
                } else {
                    generation
                };
                let bytes = txn
                    .get(&object_key(namespace, kind, name, r#gen))
                    .await
                    .map_err(store_err)?;
                let obj = bytes.map(|b| crate::domain::codec::unmarshal(&b)).transpose()?;
                Ok(FindResult::One(obj))
            }
            FindQuery::ByField { namespace, kind, field, value, pick } => {
                let mut txn = Txn::new(self.store);
                let mut entries: Vec<ListGenEntry> =
                    index::lookup_field(&mut txn, namespace, kind, field, value)
                        .await
                        .map_err(store_err)?;
                entries.sort();

                let selected: Vec<&ListGenEntry> = match pick {
                    FieldPick::All => entries.iter().collect(),
                    FieldPick::First => entries.first().into_iter().collect(),
                    FieldPick::Last => entries.last().into_iter().collect(),
                };

                let mut objects = Vec::new();
                for e in &selected {
                    let bytes = txn
                        .get(&object_key(namespace, kind, &e.name, e.generation))
                        .await
                        .map_err(store_err)?;
                    if let Some(bytes) = bytes {
                        objects.push(crate::domain::codec::unmarshal(&bytes)?);
                    }
                }

                match pick {
                    FieldPick::All => Ok(FindResult::Many(objects)),
                    FieldPick::First | FieldPick::Last => Ok(FindResult::One(objects.into_iter().next())),
                }
            }
        }
    }

    pub fn key_of(&self, object: &Object) -> Key {
        object.key()
    }
}

fn parse_object_key(key: &str) -> Option<(String, Generation)> {
    let (name_part, gen_part) = key.rsplit_once('@')?;
    let name = name_part.rsplit('/').next()?.to_string();
    let generation = gen_part.parse().ok()?;
    Some((name, generation))
}

fn store_err(e: StoreError) -> DomainError {
    DomainError::NotFound(crate::domain::model::ObjectRef {
        namespace: String::new(),
        kind: "Store",
        name: e.to_string(),
        generation: 0,
    })
}
