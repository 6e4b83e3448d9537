// meridian-core/src/domain/model/meta.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// `0` means "last/empty" wherever a generation is accepted as input.
pub type Generation = u64;

/// Metadata shared by every object kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub generation: Generation,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into(), generation: 0 }
    }
}

/// Identifies a `(namespace, kind, name)` triple, independent of generation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub namespace: String,
    pub kind: &'static str,
    pub name: String,
}

impl Key {
    pub fn new(namespace: impl Into<String>, kind: &'static str, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), kind, name: name.into() }
    }

    pub fn object_prefix(&self) -> String {
        format!("/object/{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

/// A fully-addressed object version, used to identify offenders in errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub namespace: String,
    pub kind: &'static str,
    pub name: String,
    pub generation: Generation,
}

impl ObjectRef {
    pub fn new(key: &Key, generation: Generation) -> Self {
        Self {
            namespace: key.namespace.clone(),
            kind: key.kind,
            name: key.name.clone(),
            generation,
        }
    }

    pub fn key(&self) -> Key {
        Key::new(self.namespace.clone(), self.kind, self.name.clone())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}@{}", self.namespace, self.kind, self.name, self.generation)
    }
}
