// meridian/src/commands/validate.rs
//
// USE CASE: compose a bundle into a container and run validation only, with
// no store and no resolution -- a fast check for referential integrity, rule
// weight uniqueness, and service dependency cycles.

use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL, Table};
use meridian_core::domain::policy::PolicyContainer;

use crate::commands::bundle::load_bundle;
use crate::exit::ExitCode;

pub fn execute(file: PathBuf) -> anyhow::Result<ExitCode> {
    let objects = load_bundle(&file)?;

    let mut container = PolicyContainer::new();
    for object in objects {
        let label = format!("{}/{}/{}", object.namespace(), object.kind(), object.name());
        if let Err(err) = container.add_object(object) {
            eprintln!("compose failed at {label}: {err}");
            return Ok(ExitCode::ValidationFailure);
        }
    }

    match container.validate() {
        Ok(()) => {
            println!("ok: {} objects, no offenders", container.len());
            Ok(ExitCode::Success)
        }
        Err(meridian_core::domain::error::DomainError::ValidationError { offenders }) => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["object", "reason"]);
            for offender in &offenders {
                table.add_row(vec![offender.object.to_string(), offender.reason.clone()]);
            }
            eprintln!("{table}");
            Ok(ExitCode::ValidationFailure)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::ValidationFailure)
        }
    }
}
