//! Conflict resolution for plain-value siblings.

pub mod registry;
pub mod resolver;

pub use registry::{resolver_fn, ConflictResolvable, ResolveFn, ResolverRegistry};
pub use resolver::{resolve_siblings, Resolution, SiblingResolver};
