//! Field mapping resolution.
//!
//! - [`shape`]: static structural shape of mappable types
//! - [`descriptor`]: per-type storage key and kind table
//! - [`cache`]: process-wide descriptor cache

pub mod cache;
pub mod descriptor;
pub mod shape;

pub use cache::resolve;
pub use descriptor::{FieldMapping, FieldMappingDescriptor, FieldSpec};
pub use shape::Shape;
