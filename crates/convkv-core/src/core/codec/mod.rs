//! Encoding records into map updates and decoding response trees.

pub mod decode;
pub mod encode;
pub mod record;
pub mod value;

pub use decode::{decode, decode_with_context};
pub use encode::{encode, MapUpdate};
pub use record::CrdtRecord;
pub use value::CrdtValue;

use crate::core::error::{MapperError, Result};
use crate::core::mapping::{cache, resolve};
use convkv_wire::{CrdtKind, Operation, ResponseValue};

// Support functions for `crdt_value_for_record!`.

#[doc(hidden)]
pub fn validate_record<T: CrdtRecord>() -> Result<()> {
    cache::validate::<T>()
}

#[doc(hidden)]
pub fn encode_nested<T: CrdtRecord>(record: &T) -> Result<Option<Operation>> {
    let descriptor = resolve::<T>()?;
    let op = record::encode_fields(record, &descriptor)?;
    Ok((!op.is_empty()).then_some(Operation::Map(op)))
}

#[doc(hidden)]
pub fn decode_nested<T: CrdtRecord>(
    record: &mut T,
    kind: CrdtKind,
    value: &ResponseValue,
) -> Result<()> {
    match value {
        ResponseValue::Map(map) if kind == CrdtKind::Map => {
            let descriptor = resolve::<T>()?;
            record::decode_fields(record, map, &descriptor)
        }
        other => Err(MapperError::type_mismatch(kind, other.kind())),
    }
}

#[doc(hidden)]
pub fn reset_record<T: CrdtRecord>(record: &mut T) {
    let Ok(descriptor) = resolve::<T>() else {
        return;
    };
    for mapping in descriptor.fields() {
        if let Some(field) = record.field_mut(mapping.field) {
            field.reset();
        }
    }
    record::store_context(record, &descriptor, None);
}
