// meridian-core/src/infrastructure/mod.rs
//
// Concrete adapters: storage drivers, the jinja-backed template engine,
// config loading, and the filesystem helper used by the file store.

pub mod compiler;
pub mod config;
pub mod error;
pub mod fs;
pub mod store;

pub use config::RuntimeConfig;
pub use error::InfrastructureError;
