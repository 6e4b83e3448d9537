// meridian/src/commands/apply.rs
//
// USE CASE: submit a bundle of objects and print the resulting action plan.

use std::path::PathBuf;

use meridian_core::application::PolicyService;
use meridian_core::domain::error::DomainError;
use meridian_core::infrastructure::compiler::jinja::JinjaTemplateEngine;
use meridian_core::infrastructure::store::memory::MemoryStore;
use meridian_core::ports::external_data::NullExternalData;

use crate::commands::bundle::{load_bundle, parse_user_key};
use crate::exit::ExitCode;

pub async fn execute(file: PathBuf, user: String, noop: bool) -> anyhow::Result<ExitCode> {
    let objects = load_bundle(&file)?;
    let user_key = parse_user_key(&user)?;

    let store = MemoryStore::new();
    let external = NullExternalData;
    let templates = JinjaTemplateEngine::new();
    let service = PolicyService::new(&store, &external, &templates);

    let mut last_result = None;
    for object in objects {
        let label = format!("{}/{}/{}", object.namespace(), object.kind(), object.name());
        match service.submit(object, &user_key).await {
            Ok(result) => {
                println!("submitted {label} -> generation {}", result.object.generation());
                last_result = Some(result);
            }
            Err(err) => {
                eprintln!("submit {label} failed: {err}");
                return Ok(exit_code_for(&err));
            }
        }
    }

    if noop {
        println!("--noop: plan computed, nothing persisted beyond this process's in-memory store");
    }

    match last_result {
        Some(result) => {
            println!("\nplan:\n{}", result.plan.as_text());
            if !result.events.is_empty() {
                println!("\nevents:");
                for event in &result.events {
                    println!("  {event:?}");
                }
            }
        }
        None => println!("bundle was empty, nothing submitted"),
    }

    Ok(ExitCode::Success)
}

fn exit_code_for(err: &DomainError) -> ExitCode {
    match err {
        DomainError::ResolutionCycle(_)
        | DomainError::NoMatchingContext(_)
        | DomainError::Denied { .. }
        | DomainError::UnresolvedTemplate { .. } => ExitCode::ResolutionFailure,
        _ => ExitCode::ValidationFailure,
    }
}
