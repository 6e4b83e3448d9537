// meridian-core/src/infrastructure/store/mod.rs
//
// Concrete `ports::Store` adapters: `memory` (the default) and `file` (a
// single-writer embedded driver). A distributed/MVCC driver is a documented
// extension point, not implemented here.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;
