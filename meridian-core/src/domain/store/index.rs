// meridian-core/src/domain/store/index.rs
//
// The index layer: two index families kept alongside the raw object
// keys -- `lastgen` (one entry per (ns,kind,name), pointing at the highest
// existing generation) and `listgen` (one entry per indexed field value,
// fanning out to every (ns,kind,name) that currently has that value). Both
// are maintained transactionally by the generational store; nothing else
// writes them.
//
// Key format deviates slightly from a literal `listgen/<ns>/<kind>/<name>/<field>=<value>`
// reading: entries are stored one-per-distinct-value (`listgen/<ns>/<kind>/<field>=<value>`)
// holding the sorted list of `(name, generation)` pairs current at that value,
// so a field-equality query is a single point read rather than a prefix scan
// over every name. See the grounding ledger for the rationale.

use serde::{Deserialize, Serialize};

use crate::domain::registry::Catalog;
use crate::domain::store::txn::Txn;
use crate::ports::store::StoreError;

/// `lastgen/<ns>/<kind>/<name>` -> ASCII generation number.
pub fn last_gen_key(namespace: &str, kind: &str, name: &str) -> String {
    format!("lastgen/{namespace}/{kind}/{name}")
}

/// `listgen/<ns>/<kind>/<field>=<value>` -> JSON-encoded sorted `Vec<ListGenEntry>`.
pub fn list_gen_key(namespace: &str, kind: &str, field: &str, value: &str) -> String {
    format!("listgen/{namespace}/{kind}/{field}={value}")
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListGenEntry {
    pub name: String,
    pub generation: u64,
}

pub async fn read_last_gen(
    txn: &mut Txn<'_>,
    namespace: &str,
    kind: &str,
    name: &str,
) -> Result<Option<u64>, StoreError> {
    let raw = txn.get(&last_gen_key(namespace, kind, name)).await?;
    Ok(raw.and_then(|bytes| std::str::from_utf8(&bytes).ok()?.parse::<u64>().ok()))
}

pub fn write_last_gen(txn: &mut Txn<'_>, namespace: &str, kind: &str, name: &str, r#gen: u64) {
    txn.put(last_gen_key(namespace, kind, name), r#gen.to_string().into_bytes());
}

async fn read_list(txn: &mut Txn<'_>, key: &str) -> Result<Vec<ListGenEntry>, StoreError> {
    match txn.get(key).await? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

fn write_list(txn: &mut Txn<'_>, key: &str, mut entries: Vec<ListGenEntry>) {
    if entries.is_empty() {
        txn.delete(key.to_string());
        return;
    }
    entries.sort();
    entries.dedup();
    let bytes = serde_json::to_vec(&entries).unwrap_or_default();
    txn.put(key.to_string(), bytes);
}

/// Looks up the objects currently holding `value` for `field`, in stored
/// (sorted) order.
pub async fn lookup_field(
    txn: &mut Txn<'_>,
    namespace: &str,
    kind: &str,
    field: &str,
    value: &str,
) -> Result<Vec<ListGenEntry>, StoreError> {
    read_list(txn, &list_gen_key(namespace, kind, field, value)).await
}

/// Replaces every `listgen` marker for `(namespace, kind, name)` with the set
/// derived from `object` via `catalog`'s registered index fields, first
/// stripping the name from whatever value it previously pointed to so stale
/// `listgen` entries from a changed field value no longer linger.
pub async fn reindex(
    txn: &mut Txn<'_>,
    catalog: &Catalog,
    namespace: &str,
    kind: &str,
    name: &str,
    object: Option<&crate::domain::model::Object>,
    generation: u64,
) -> Result<(), StoreError> {
    let Some(type_info) = catalog.lookup(kind) else {
        return Ok(());
    };

    for (field, transform) in &type_info.index_fields {
        let new_value = object.and_then(|o| transform(o));

        // Scan prior listgen keys for this field and drop any entry for `name`
        // whose value no longer matches (covers both "field value changed" and
        // "object deleted").
        let prefix = format!("listgen/{namespace}/{kind}/{field}=");
        for (key, _) in txn.range(&prefix).await? {
            let value_part = key.rsplit_once('=').map(|(_, v)| v).unwrap_or_default();
            if new_value.as_deref() == Some(value_part) {
                continue;
            }
            let mut entries = read_list(txn, &key).await?;
            let before = entries.len();
            entries.retain(|e| e.name != name);
            if entries.len() != before {
                write_list(txn, &key, entries);
            }
        }

        if let Some(value) = new_value {
            let key = list_gen_key(namespace, kind, field, &value);
            let mut entries = read_list(txn, &key).await?;
            entries.retain(|e| e.name != name);
            entries.push(ListGenEntry { name: name.to_string(), generation });
            write_list(txn, &key, entries);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_gen_key_is_stable_per_object() {
        assert_eq!(last_gen_key("p", "Service", "kafka"), "lastgen/p/Service/kafka");
    }

    #[test]
    fn list_gen_entry_ordering_is_by_name() {
        let mut v = vec![
            ListGenEntry { name: "b".into(), generation: 1 },
            ListGenEntry { name: "a".into(), generation: 2 },
        ];
        v.sort();
        assert_eq!(v[0].name, "a");
    }
}
