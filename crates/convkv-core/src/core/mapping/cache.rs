//! Process-wide descriptor cache.
//!
//! Descriptors are computed once per record type and shared read-only. Each
//! type gets its own initialisation cell, so resolving one type never waits
//! on another type being built. Failures are cached as well and replayed to
//! every later caller.
//!
//! Resolution has two steps. The type's own field table is built inside its
//! cell; nothing else is resolved while that cell is held. Record types
//! nested in the fields are validated afterwards, outside any cell, so
//! mutually recursive records resolved from several threads at once cannot
//! wait on each other.

use crate::core::codec::CrdtRecord;
use crate::core::error::Result;
use crate::core::mapping::FieldMappingDescriptor;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct Slot {
    descriptor: OnceCell<Result<Arc<FieldMappingDescriptor>>>,
    nested: OnceCell<Result<()>>,
}

static DESCRIPTORS: Lazy<RwLock<HashMap<TypeId, Arc<Slot>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

thread_local! {
    // Types whose nested records are being validated on this thread.
    static VALIDATING: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
    // Types reported valid only because they were already being validated.
    static ASSUMED: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
}

/// Get the descriptor for `T`, building it on first use.
pub fn resolve<T: CrdtRecord>() -> Result<Arc<FieldMappingDescriptor>> {
    let slot = slot_for(TypeId::of::<T>());
    let descriptor = slot.descriptor.get_or_init(build::<T>).clone()?;
    if let Some(nested) = slot.nested.get() {
        return nested.clone().map(|()| descriptor);
    }
    check_nested::<T>(&slot, &descriptor).map(|()| descriptor)
}

/// Validate `T`'s mapping without holding on to the descriptor.
///
/// A type already being validated further up this thread's stack is
/// reported valid so that recursive records terminate.
pub(crate) fn validate<T: CrdtRecord>() -> Result<()> {
    let id = TypeId::of::<T>();
    if VALIDATING.with(|v| v.borrow().contains(&id)) {
        ASSUMED.with(|a| a.borrow_mut().insert(id));
        return Ok(());
    }
    resolve::<T>().map(drop)
}

/// Number of record types resolved so far.
#[must_use]
pub fn cached_types() -> usize {
    DESCRIPTORS.read().len()
}

fn slot_for(id: TypeId) -> Arc<Slot> {
    if let Some(slot) = DESCRIPTORS.read().get(&id) {
        return slot.clone();
    }
    DESCRIPTORS.write().entry(id).or_default().clone()
}

fn build<T: CrdtRecord>() -> Result<Arc<FieldMappingDescriptor>> {
    let result = FieldMappingDescriptor::build(T::type_name(), T::field_specs());
    match &result {
        Ok(descriptor) => tracing::debug!(
            type_name = T::type_name(),
            fields = descriptor.len(),
            "resolved field mapping"
        ),
        Err(e) => tracing::warn!(type_name = T::type_name(), "field mapping rejected: {}", e),
    }
    result.map(Arc::new)
}

/// Validate the records nested in `T` and cache the outcome.
///
/// Several threads may run this for the same type; the first stored outcome
/// wins. A success that relied on an enclosing type still being validated is
/// returned but not cached, since that enclosing type may yet fail.
fn check_nested<T: CrdtRecord>(slot: &Slot, descriptor: &FieldMappingDescriptor) -> Result<()> {
    let id = TypeId::of::<T>();
    VALIDATING.with(|v| v.borrow_mut().insert(id));
    let outer = ASSUMED.with(|a| a.take());

    let result = descriptor.check_nested();

    VALIDATING.with(|v| v.borrow_mut().remove(&id));
    let mut assumed = ASSUMED.with(|a| a.replace(outer));
    assumed.remove(&id);
    let provisional = result.is_ok() && !assumed.is_empty();
    ASSUMED.with(|a| a.borrow_mut().extend(assumed));

    if provisional {
        return result;
    }
    if let Err(e) = &result {
        tracing::warn!(type_name = T::type_name(), "nested field mapping rejected: {}", e);
    }
    slot.nested.get_or_init(|| result).clone()
}
