// meridian-core/src/domain/policy/mod.rs
//
// The policy container: typed-object storage, the ACL-scoped view, and
// the validation pass run before any container swap is published.

pub mod container;
pub mod validate;
pub mod view;

pub use container::{PolicyContainer, SharedPolicyContainer};
pub use view::ScopedView;
