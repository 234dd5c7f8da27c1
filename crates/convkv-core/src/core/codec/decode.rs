//! Response Tree to record decoding.

use crate::core::codec::record::{decode_fields, store_context};
use crate::core::codec::CrdtRecord;
use crate::core::error::Result;
use crate::core::mapping::resolve;
use convkv_wire::{CausalContext, MapValue};
use tracing::debug;

/// Populate `dest` from a map response.
///
/// Decoding is atomic: fields are written to a copy of `dest`, which replaces
/// it only once every field decoded. On error `dest` is left untouched.
/// Response keys without a matching field are ignored and fields without a
/// response key are reset to their zero value.
pub fn decode<T: CrdtRecord + Clone>(response: &MapValue, dest: &mut T) -> Result<()> {
    decode_into(response, None, dest)
}

/// Like [`decode`], and also stores `context` in the record's context field.
pub fn decode_with_context<T: CrdtRecord + Clone>(
    response: &MapValue,
    context: Option<CausalContext>,
    dest: &mut T,
) -> Result<()> {
    decode_into(response, Some(context), dest)
}

fn decode_into<T: CrdtRecord + Clone>(
    response: &MapValue,
    context: Option<Option<CausalContext>>,
    dest: &mut T,
) -> Result<()> {
    let descriptor = resolve::<T>()?;
    debug!(
        type_name = descriptor.type_name(),
        fields = descriptor.len(),
        entries = response.len(),
        "decoding record"
    );

    let mut scratch = dest.clone();
    decode_fields(&mut scratch, response, &descriptor)?;
    if let Some(context) = context {
        store_context(&mut scratch, &descriptor, context);
    }
    *dest = scratch;
    Ok(())
}
