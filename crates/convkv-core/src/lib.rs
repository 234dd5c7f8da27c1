//! convkv-core: typed CRDT mapping for a convergent key-value store.
//!
//! - **mapping**: per-type field mapping descriptors, resolved once and cached.
//! - **codec**: records to Operation Trees and Response Trees back to records.
//! - **siblings**: conflict resolution for plain values, with write-back.
//! - **command**: bucket-oriented command builders run against a [`Session`].
//! - **ts**: time-series rows (feature `timeseries`).

pub mod core;

pub use crate::core::codec;
pub use crate::core::mapping;
pub use crate::core::siblings;
#[cfg(feature = "timeseries")]
pub use crate::core::ts;

// Top-level re-exports for common usage
pub use crate::core::error::{DecodeErrorKind, MapperError, Result};
pub use crate::core::{
    decode, decode_with_context, encode, resolve_siblings, resolver_fn, Bucket, ClientConfig,
    CommandResult, ConflictResolvable, CrdtRecord, CrdtValue, FieldMapping, FieldMappingDescriptor,
    FieldSpec, MapUpdate, ResolveFn, Resolution, ResolverRegistry, Session, Shape, SiblingResolver,
    WritePolicy,
};
pub use convkv_wire::{
    CausalContext, ConflictObject, CrdtKind, Location, MapOperation, MapValue, Operation,
    ResolvedConflict, ResponseValue, SetOperation, Transport, TransportError, TsCell, TsRow,
};
pub use convkv_wire::types::ts_time_format;

#[cfg(feature = "timeseries")]
pub use crate::core::ts::{
    decode_row, encode_row, ts_query, ts_read, ts_write, TsColumn, TsFieldSpec, TsRecord, TsValue,
};
