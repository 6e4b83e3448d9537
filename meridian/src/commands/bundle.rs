// meridian/src/commands/bundle.rs
//
// Shared loading for the harness commands: a bundle file is just a YAML
// sequence of "kind"-tagged objects, submitted in file order.

use std::path::Path;

use anyhow::{Context, Result};
use meridian_core::domain::model::{Key, Object, ALL_KINDS};

pub fn load_bundle(path: &Path) -> Result<Vec<Object>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading bundle file {}", path.display()))?;
    let objects: Vec<Object> = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing bundle file {} as a YAML object sequence", path.display()))?;
    Ok(objects)
}

pub fn parse_kind(raw: &str) -> Result<&'static str> {
    ALL_KINDS
        .iter()
        .find(|k| k.eq_ignore_ascii_case(raw))
        .copied()
        .with_context(|| format!("unknown object kind '{raw}', expected one of {ALL_KINDS:?}"))
}

pub fn parse_user_key(raw: &str) -> Result<Key> {
    let (namespace, name) = raw
        .split_once('/')
        .with_context(|| format!("user key '{raw}' must be \"namespace/name\""))?;
    Ok(Key::new(namespace, meridian_core::domain::model::KIND_USER, name))
}
