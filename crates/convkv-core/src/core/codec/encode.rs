//! Record to Operation Tree encoding.

use crate::core::codec::record::{embedded_context, encode_fields};
use crate::core::codec::CrdtRecord;
use crate::core::error::Result;
use crate::core::mapping::resolve;
use convkv_wire::{CausalContext, MapOperation};
use tracing::debug;

/// An encoded map update, ready to hand to the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapUpdate {
    pub operation: MapOperation,
    /// Context the update is merged against; `None` on a first write.
    pub context: Option<CausalContext>,
}

impl MapUpdate {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operation.is_empty()
    }
}

/// Encode `value` into a map update.
///
/// Empty fields are left out of the tree. A non-empty `existing` context is
/// attached to the update; otherwise the record's embedded context field, if
/// any, is used. The first failing field aborts the whole encode and no
/// partial tree is returned.
pub fn encode<T: CrdtRecord>(value: &T, existing: Option<CausalContext>) -> Result<MapUpdate> {
    let descriptor = resolve::<T>()?;
    let operation = encode_fields(value, &descriptor)?;
    let context = existing
        .and_then(CausalContext::non_empty)
        .or_else(|| embedded_context(value, &descriptor));

    debug!(
        type_name = descriptor.type_name(),
        fields = descriptor.len(),
        entries = operation.len(),
        has_context = context.is_some(),
        "encoded record"
    );
    Ok(MapUpdate { operation, context })
}
