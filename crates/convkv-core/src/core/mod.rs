//! Mapping engine, sibling resolution and the command facade.

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod mapping;
pub mod session;
pub mod siblings;
#[cfg(feature = "timeseries")]
pub mod ts;

pub use codec::{decode, decode_with_context, encode, CrdtRecord, CrdtValue, MapUpdate};
pub use command::{Bucket, CommandResult};
pub use config::{ClientConfig, WritePolicy};
pub use error::{DecodeErrorKind, MapperError, Result};
pub use mapping::{FieldMapping, FieldMappingDescriptor, FieldSpec, Shape};
pub use session::Session;
pub use siblings::{
    resolve_siblings, resolver_fn, ConflictResolvable, ResolveFn, Resolution, ResolverRegistry,
    SiblingResolver,
};
