//! ConflictResolvable trait and the per-session resolver registry.
//!
//! A fetch that returns several siblings needs a resolution function. It is
//! taken from, in order:
//!
//! | Source | How |
//! |--------|-----|
//! | Explicit | passed to the command for this call only |
//! | Capability | the destination type implements [`ConflictResolvable`] and was registered |
//! | None | the fetch fails with `NoConflictResolver` |

use convkv_wire::{ConflictObject, ResolvedConflict};
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A sibling resolution function.
pub type ResolveFn = Arc<dyn Fn(&[ConflictObject]) -> ResolvedConflict + Send + Sync>;

/// Wrap a closure as a [`ResolveFn`].
pub fn resolver_fn<F>(f: F) -> ResolveFn
where
    F: Fn(&[ConflictObject]) -> ResolvedConflict + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Types that know how to merge their own siblings.
///
/// The function receives every sibling and must return exactly one value
/// with a non-empty causal context, usually one of the siblings' own.
pub trait ConflictResolvable: 'static {
    fn resolve_conflict(siblings: &[ConflictObject]) -> ResolvedConflict;
}

struct Entry {
    type_name: &'static str,
    resolve: ResolveFn,
}

/// Resolution capabilities keyed by destination type.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    entries: Arc<RwLock<HashMap<TypeId, Entry>>>,
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("ResolverRegistry")
            .field(
                "registered_types",
                &entries.values().map(|e| e.type_name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ResolverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`'s own resolution capability.
    pub fn register<T: ConflictResolvable>(&self) {
        self.register_fn::<T, _>(T::resolve_conflict);
    }

    /// Register a resolution function for values of type `T`.
    ///
    /// Replaces any function registered earlier for `T`.
    pub fn register_fn<T: 'static, F>(&self, f: F)
    where
        F: Fn(&[ConflictObject]) -> ResolvedConflict + Send + Sync + 'static,
    {
        self.entries.write().insert(
            TypeId::of::<T>(),
            Entry {
                type_name: type_name::<T>(),
                resolve: Arc::new(f),
            },
        );
    }

    /// The resolution function registered for `T`, if any.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<ResolveFn> {
        self.entries
            .read()
            .get(&TypeId::of::<T>())
            .map(|e| e.resolve.clone())
    }

    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use convkv_wire::CausalContext;

    struct Newest;

    impl ConflictResolvable for Newest {
        fn resolve_conflict(siblings: &[ConflictObject]) -> ResolvedConflict {
            siblings
                .iter()
                .max_by_key(|s| s.last_modified)
                .map(ConflictObject::resolved)
                .unwrap_or_else(|| ResolvedConflict::new("", CausalContext::empty()))
        }
    }

    fn sibling(value: &'static str, secs: i64) -> ConflictObject {
        ConflictObject {
            value: value.into(),
            last_modified: Utc.timestamp_opt(secs, 0).unwrap(),
            vclock: CausalContext::from(value.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_register_capability() {
        let registry = ResolverRegistry::new();
        assert!(registry.get::<Newest>().is_none());

        registry.register::<Newest>();
        assert!(registry.contains::<Newest>());
        assert_eq!(registry.len(), 1);

        let resolve = registry.get::<Newest>().unwrap();
        let siblings = vec![sibling("old", 10), sibling("new", 20)];
        let resolved = resolve(siblings.as_slice());
        assert_eq!(resolved.value, "new");
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = ResolverRegistry::new();
        let clone = registry.clone();
        clone.register_fn::<String, _>(|s| s[0].resolved());
        assert!(registry.contains::<String>());
        assert!(format!("{:?}", registry).contains("String"));
    }
}
