// meridian-core/src/lib.rs

#![allow(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (interfaces the core depends on, implemented outside the core)
pub mod ports;

// 2. Domain (policy entities, registry, store semantics, resolver, diff)
// Depends on nothing but ports.
pub mod domain;

// 3. Infrastructure (concrete adapters: codec, in-memory/file store, jinja)
pub mod infrastructure;

// 4. Application (use cases: policy update orchestration, enforcement loop)
pub mod application;

// --- TOP-LEVEL ERROR ---
pub mod error;

pub use error::MeridianError;
