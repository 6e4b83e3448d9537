// meridian/src/commands/get.rs
//
// USE CASE: fetch one object out of a composed bundle by its key, printed as
// canonical JSON. A debugging aid; real lookups against a running store go
// through `PolicyService::get_policy`, not this command.

use std::path::PathBuf;

use meridian_core::domain::model::Key;
use meridian_core::domain::policy::PolicyContainer;

use crate::commands::bundle::{load_bundle, parse_kind};
use crate::exit::ExitCode;

pub fn execute(file: PathBuf, namespace: String, kind: String, name: String) -> anyhow::Result<ExitCode> {
    let objects = load_bundle(&file)?;
    let kind = parse_kind(&kind)?;

    let mut container = PolicyContainer::new();
    for object in objects {
        container.add_object(object)?;
    }

    let key = Key::new(namespace, kind, name);
    match container.get_object(&key) {
        Some(object) => {
            println!("{}", serde_json::to_string_pretty(object)?);
            Ok(ExitCode::Success)
        }
        None => {
            eprintln!("{key} not found in bundle");
            Ok(ExitCode::ValidationFailure)
        }
    }
}
