//! Record types and their registration macro.

use crate::core::codec::CrdtValue;
use crate::core::error::{MapperError, Result};
use crate::core::mapping::{FieldMappingDescriptor, FieldSpec};
use convkv_wire::{CausalContext, MapOperation, MapValue};

/// A struct stored as a CRDT map, one entry per field.
///
/// Usually implemented through [`crdt_record!`](crate::crdt_record); a hand
/// written implementation must list every field in `field_specs` and expose
/// the same names through `field` and `field_mut`.
pub trait CrdtRecord: CrdtValue + Sized {
    fn type_name() -> &'static str;

    /// Field declarations in declaration order.
    fn field_specs() -> Vec<FieldSpec>;

    fn field(&self, name: &str) -> Option<&dyn CrdtValue>;

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn CrdtValue>;
}

fn missing_field(descriptor: &FieldMappingDescriptor, field: &str) -> MapperError {
    let reason = format!("{} does not expose this field", descriptor.type_name());
    MapperError::malformed("", reason).at(field)
}

/// Encode every mapped field of `record` into a map update.
pub(crate) fn encode_fields<T: CrdtRecord>(
    record: &T,
    descriptor: &FieldMappingDescriptor,
) -> Result<MapOperation> {
    let mut op = MapOperation::new();
    for mapping in descriptor.fields() {
        let value = record
            .field(mapping.field)
            .ok_or_else(|| missing_field(descriptor, mapping.field))?;
        if let Some(entry) = value
            .encode_value(mapping.kind)
            .map_err(|e| e.at(mapping.field))?
        {
            op.insert(mapping.storage_key.clone(), entry);
        }
    }
    Ok(op)
}

/// Populate `record` from a response tree.
///
/// Keys without a field are ignored; fields without a key are reset.
pub(crate) fn decode_fields<T: CrdtRecord>(
    record: &mut T,
    response: &MapValue,
    descriptor: &FieldMappingDescriptor,
) -> Result<()> {
    for mapping in descriptor.fields() {
        let value = record
            .field_mut(mapping.field)
            .ok_or_else(|| missing_field(descriptor, mapping.field))?;
        match response.get(&mapping.storage_key) {
            Some(raw) => value
                .decode_value(mapping.kind, raw)
                .map_err(|e| e.at(mapping.field))?,
            None => value.reset(),
        }
    }
    Ok(())
}

/// The record's embedded context, if it declares one and it is non-empty.
pub(crate) fn embedded_context<T: CrdtRecord>(
    record: &T,
    descriptor: &FieldMappingDescriptor,
) -> Option<CausalContext> {
    let field = descriptor.context_field()?;
    record
        .field(field)
        .and_then(|f| f.as_context())
        .cloned()
        .and_then(CausalContext::non_empty)
}

pub(crate) fn store_context<T: CrdtRecord>(
    record: &mut T,
    descriptor: &FieldMappingDescriptor,
    context: Option<CausalContext>,
) {
    let Some(field) = descriptor.context_field() else {
        return;
    };
    if let Some(slot) = record.field_mut(field) {
        slot.set_context(context.unwrap_or_default());
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __crdt_tag {
    () => {
        ::std::option::Option::None
    };
    ($tag:literal) => {
        ::std::option::Option::Some($tag)
    };
}

/// Declare a struct and register it as a CRDT record.
///
/// Each field may carry a `#[crdt("key,kind")]` tag next to its other
/// attributes and doc comments. A field of type
/// [`CausalContext`](convkv_wire::CausalContext) receives the fetched context
/// and is not stored.
///
/// ```
/// use convkv_core::crdt_record;
///
/// crdt_record! {
///     #[derive(Clone, Debug, Default, PartialEq)]
///     pub struct User {
///         /// Display name.
///         #[crdt("name,")]
///         pub name: String,
///         #[crdt("visits,register")]
///         pub visits: u32,
///         pub tags: Vec<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! crdt_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__crdt_fields! {
            @record [$(#[$meta])*] [$vis] $name
            @fields []
            @attrs []
            @tag []
            $($body)*
        }
    };
}

/// Splits the body of a `crdt_record!` struct into fields, separating the
/// `#[crdt(..)]` tag from the attributes kept on the field.
#[doc(hidden)]
#[macro_export]
macro_rules! __crdt_fields {
    (
        @record $record:tt $vis:tt $name:ident
        @fields [$($fields:tt)*]
        @attrs [$($attrs:tt)*]
        @tag [$($tag:tt)*]
        #[crdt($t:literal)] $($rest:tt)*
    ) => {
        $crate::__crdt_fields! {
            @record $record $vis $name
            @fields [$($fields)*]
            @attrs [$($attrs)*]
            @tag [$t]
            $($rest)*
        }
    };
    (
        @record $record:tt $vis:tt $name:ident
        @fields [$($fields:tt)*]
        @attrs [$($attrs:tt)*]
        @tag [$($tag:tt)*]
        #[$attr:meta] $($rest:tt)*
    ) => {
        $crate::__crdt_fields! {
            @record $record $vis $name
            @fields [$($fields)*]
            @attrs [$($attrs)* #[$attr]]
            @tag [$($tag)*]
            $($rest)*
        }
    };
    (
        @record $record:tt $vis:tt $name:ident
        @fields [$($fields:tt)*]
        @attrs [$($attrs:tt)*]
        @tag [$($tag:tt)*]
        $fvis:vis $field:ident : $ty:ty $(, $($rest:tt)*)?
    ) => {
        $crate::__crdt_fields! {
            @record $record $vis $name
            @fields [$($fields)* { [$($attrs)*] [$($tag)*] [$fvis] $field [$ty] }]
            @attrs []
            @tag []
            $($($rest)*)?
        }
    };
    (
        @record [$(#[$meta:meta])*] [$vis:vis] $name:ident
        @fields [$({
            [$(#[$fattr:meta])*] [$($tag:literal)?] [$fvis:vis] $field:ident [$ty:ty]
        })*]
        @attrs []
        @tag []
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fattr])* $fvis $field: $ty, )*
        }

        impl $crate::CrdtRecord for $name {
            fn type_name() -> &'static str {
                stringify!($name)
            }

            fn field_specs() -> ::std::vec::Vec<$crate::FieldSpec> {
                ::std::vec![
                    $(
                        $crate::FieldSpec::new::<$ty>(
                            stringify!($field),
                            $crate::__crdt_tag!($($tag)?),
                        ),
                    )*
                ]
            }

            #[allow(unused_variables)]
            fn field(&self, name: &str) -> ::std::option::Option<&dyn $crate::CrdtValue> {
                $(
                    if name == stringify!($field) {
                        return ::std::option::Option::Some(&self.$field as &dyn $crate::CrdtValue);
                    }
                )*
                ::std::option::Option::None
            }

            #[allow(unused_variables)]
            fn field_mut(
                &mut self,
                name: &str,
            ) -> ::std::option::Option<&mut dyn $crate::CrdtValue> {
                $(
                    if name == stringify!($field) {
                        let value: &mut dyn $crate::CrdtValue = &mut self.$field;
                        return ::std::option::Option::Some(value);
                    }
                )*
                ::std::option::Option::None
            }
        }

        $crate::crdt_value_for_record!($name);
    };
}

/// Implement [`CrdtValue`] for a record type so it can be nested in another
/// record. `crdt_record!` already does this; hand-written records call it
/// directly.
#[macro_export]
macro_rules! crdt_value_for_record {
    ($name:ty) => {
        impl $crate::CrdtValue for $name {
            fn shape() -> $crate::Shape {
                $crate::Shape::Record(<$name as $crate::CrdtRecord>::type_name())
            }

            fn check() -> $crate::Result<()> {
                $crate::codec::validate_record::<$name>()
            }

            fn encode_value(
                &self,
                _kind: $crate::CrdtKind,
            ) -> $crate::Result<::std::option::Option<$crate::Operation>> {
                $crate::codec::encode_nested(self)
            }

            fn decode_value(
                &mut self,
                kind: $crate::CrdtKind,
                value: &$crate::ResponseValue,
            ) -> $crate::Result<()> {
                $crate::codec::decode_nested(self, kind, value)
            }

            fn reset(&mut self) {
                $crate::codec::reset_record(self)
            }
        }
    };
}
